//! Inserción masiva de registros en la base externa (Postgres de Supabase).
//!
//! Cada categoría va a su propia tabla (snake_case) y se inserta en una
//! transacción propia: si una categoría falla, las demás ya insertadas no se
//! revierten.
//!
//! El cliente `postgres` es síncrono y levanta su propio runtime, así que
//! cada operación corre en un hilo dedicado para no chocar con el runtime de
//! actix.

use postgres::types::ToSql;
use postgres::{Client, NoTls};
use tracing::info;

use crate::error::ErroPersistencia;
use crate::excel::mapeo::campos_da_categoria;
use crate::models::{Campo, Categoria, Registro, TipoCampo, ValorCampo};

/// Filas por sentencia INSERT (Postgres admite hasta 65535 parámetros).
pub const TAMANHO_LOTE: usize = 500;

type Parametro = Box<dyn ToSql + Sync + Send>;

#[derive(Clone, Debug)]
pub struct DestinoPostgres {
    url: String,
}

impl DestinoPostgres {
    pub fn new(url: &str) -> Self {
        DestinoPostgres { url: url.to_string() }
    }

    /// Crea las tablas de todas las categorías si no existen.
    pub fn inicializar(&self) -> Result<(), ErroPersistencia> {
        let url = self.url.clone();
        executar_em_thread(move || {
            let mut client = Client::connect(&url, NoTls)?;
            let ddl: Vec<String> = Categoria::TODAS.into_iter().map(sql_criar_tabela).collect();
            client.batch_execute(&ddl.join("\n"))?;
            Ok(())
        })
    }

    /// Inserta los registros de una categoría en una sola transacción.
    /// Devuelve la cantidad de filas insertadas.
    pub fn inserir(&self, categoria: Categoria, registros: &[Registro]) -> Result<usize, ErroPersistencia> {
        if registros.is_empty() {
            return Ok(0);
        }
        let url = self.url.clone();
        let registros = registros.to_vec();
        let inseridos = executar_em_thread(move || {
            let campos = campos_da_categoria(categoria);
            let mut client = Client::connect(&url, NoTls)?;
            let mut tx = client.transaction()?;
            let mut total = 0;
            for lote in registros.chunks(TAMANHO_LOTE) {
                let sql = sql_insert(categoria, &campos, lote.len());
                let valores: Vec<Parametro> = lote.iter().flat_map(|r| parametros(r, &campos)).collect();
                let refs: Vec<&(dyn ToSql + Sync)> = valores.iter().map(|v| v.as_ref() as &(dyn ToSql + Sync)).collect();
                total += tx.execute(sql.as_str(), &refs)? as usize;
            }
            tx.commit()?;
            Ok(total)
        })?;
        info!("{} registros inseridos em {}", inseridos, categoria.tabela());
        Ok(inseridos)
    }
}

fn executar_em_thread<T, F>(f: F) -> Result<T, ErroPersistencia>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ErroPersistencia> + Send + 'static,
{
    std::thread::spawn(f)
        .join()
        .map_err(|e| ErroPersistencia::Hilo(format!("{:?}", e)))?
}

fn tipo_sql(tipo: TipoCampo) -> &'static str {
    match tipo {
        TipoCampo::Numero => "DOUBLE PRECISION",
        TipoCampo::Data => "DATE",
        TipoCampo::Texto | TipoCampo::Identificador => "TEXT",
    }
}

/// DDL de la tabla destino de una categoría.
pub fn sql_criar_tabela(categoria: Categoria) -> String {
    let mut colunas = vec![
        "id TEXT PRIMARY KEY".to_string(),
        "aba_origem TEXT NOT NULL".to_string(),
        "linha_origem BIGINT NOT NULL".to_string(),
    ];
    for campo in campos_da_categoria(categoria) {
        colunas.push(format!("{} {}", campo.coluna_sql(), tipo_sql(campo.tipo_nativo())));
    }
    colunas.push("importado_em TIMESTAMPTZ NOT NULL DEFAULT now()".to_string());
    format!("CREATE TABLE IF NOT EXISTS {} (\n    {}\n);", categoria.tabela(), colunas.join(",\n    "))
}

/// INSERT multi-fila con placeholders numerados ($1, $2, ...).
pub fn sql_insert(categoria: Categoria, campos: &[Campo], filas: usize) -> String {
    let mut colunas = vec!["id", "aba_origem", "linha_origem"];
    colunas.extend(campos.iter().map(|c| c.coluna_sql()));
    let por_fila = colunas.len();

    let valores: Vec<String> = (0..filas)
        .map(|f| {
            let marcadores: Vec<String> = (1..=por_fila).map(|i| format!("${}", f * por_fila + i)).collect();
            format!("({})", marcadores.join(", "))
        })
        .collect();

    format!("INSERT INTO {} ({}) VALUES {}", categoria.tabela(), colunas.join(", "), valores.join(", "))
}

fn parametros(registro: &Registro, campos: &[Campo]) -> Vec<Parametro> {
    let mut valores: Vec<Parametro> = vec![
        Box::new(registro.id.clone()),
        Box::new(registro.aba_origem.clone()),
        Box::new(registro.linha_origem as i64),
    ];
    for campo in campos {
        let valor: Parametro = match (campo.tipo_nativo(), registro.valor(*campo)) {
            (_, Some(ValorCampo::Numero(n))) => Box::new(Some(n)),
            (_, Some(ValorCampo::Texto(s))) => Box::new(Some(s)),
            (_, Some(ValorCampo::Data(d))) => Box::new(Some(d)),
            (_, Some(ValorCampo::Identificador(v))) => Box::new(Some(v.to_string())),
            // NULL tipado según la columna
            (TipoCampo::Numero, None) => Box::new(None::<f64>),
            (TipoCampo::Data, None) => Box::new(None::<chrono::NaiveDate>),
            (TipoCampo::Texto | TipoCampo::Identificador, None) => Box::new(None::<String>),
        };
        valores.push(valor);
    }
    valores
}
