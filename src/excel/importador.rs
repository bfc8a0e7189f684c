//! Orquestador de importación: recorre todas las hojas del libro, aplica
//! mapeo → relleno → procesamiento de filas, clasifica cada hoja en una
//! categoría y arma el resumen que se devuelve al cliente.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::ErroImportacao;
use crate::excel::fila::{procesar_fila, ContextoHoja, MIN_CELULAS_PADRAO};
use crate::excel::io::{ler_libro, ler_libro_bytes, CeldaCruda, HojaCruda, LibroCrudo};
use crate::excel::mapeo::{buscar_mapeo, MapeoHoja};
use crate::excel::relleno::preencher_para_baixo;
use crate::models::{Categoria, Registro};

/// Palabras clave para clasificar hojas, en orden de prioridad. El genérico
/// "INSUMOS" va al final para no tapar hojas con nombre de sitio.
pub const CLASIFICACION: [(&str, Categoria); 7] = [
    ("OXIFERTIL", Categoria::Oxifertil),
    ("SANTA IRENE", Categoria::InsumosFazendas),
    ("DANIELA", Categoria::InsumosFazendas),
    ("COMPOSTO", Categoria::Composto),
    ("VIAGENS", Categoria::ViagensAdubo),
    ("PLANTIO", Categoria::PlantioDiario),
    ("INSUMOS", Categoria::InsumosFazendas),
];

/// Primera categoría cuya palabra clave aparece en el nombre de la hoja.
pub fn clasificar_aba(nome_aba: &str) -> Option<Categoria> {
    let upper = nome_aba.to_uppercase();
    CLASIFICACION.iter().find(|(clave, _)| upper.contains(clave)).map(|(_, c)| *c)
}

#[derive(Clone, Debug)]
pub struct OpcoesImportacao {
    pub min_celulas: usize,
    /// Máximo de registros de muestra por hoja en el resumen.
    pub tamanho_amostra: usize,
}

impl Default for OpcoesImportacao {
    fn default() -> Self {
        OpcoesImportacao { min_celulas: MIN_CELULAS_PADRAO, tamanho_amostra: 5 }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumoAba {
    /// Registros aceptados.
    pub rows: usize,
    pub headers: Vec<String>,
    pub sample_data: Vec<Registro>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Categoria>,
    /// Filas con contenido que no formaron registro.
    pub discarded_rows: usize,
    /// Filas que fallaron al procesarse.
    pub failed_rows: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoImportacao {
    Ok,
    Parcial,
    Erro,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResumoImportacao {
    pub success: bool,
    pub status: EstadoImportacao,
    pub message: String,
    /// Hojas en el orden del libro.
    #[serde(serialize_with = "serializar_abas")]
    pub sheets: Vec<(String, ResumoAba)>,
    pub totals: BTreeMap<Categoria, usize>,
}

impl ResumoImportacao {
    pub fn aba(&self, nome: &str) -> Option<&ResumoAba> {
        self.sheets.iter().find(|(n, _)| n == nome).map(|(_, r)| r)
    }
}

fn serializar_abas<S: Serializer>(abas: &[(String, ResumoAba)], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(abas.len()))?;
    for (nome, resumo) in abas {
        map.serialize_entry(nome, resumo)?;
    }
    map.end()
}

/// Resumen + registros agrupados por categoría.
#[derive(Clone, Debug)]
pub struct ResultadoImportacao {
    pub resumo: ResumoImportacao,
    pub registros: BTreeMap<Categoria, Vec<Registro>>,
}

impl ResultadoImportacao {
    /// Fallo total (libro ilegible): sin hojas ni registros.
    pub fn falha(message: String) -> Self {
        ResultadoImportacao {
            resumo: ResumoImportacao {
                success: false,
                status: EstadoImportacao::Erro,
                message,
                sheets: Vec::new(),
                totals: totais_vacios(),
            },
            registros: BTreeMap::new(),
        }
    }
}

fn totais_vacios() -> BTreeMap<Categoria, usize> {
    Categoria::TODAS.into_iter().map(|c| (c, 0)).collect()
}

/// Procesa una hoja ya mapeada. Devuelve el resumen de la hoja y sus registros.
fn importar_aba(
    hoja: &HojaCruda,
    mapeo: Option<&MapeoHoja>,
    opcoes: &OpcoesImportacao,
) -> (ResumoAba, Option<(Categoria, Vec<Registro>)>) {
    let Some(mapeo) = mapeo else {
        warn!("aba '{}' não mapeada, ignorada", hoja.nombre);
        let resumo = ResumoAba { error: Some(format!("Aba não mapeada: {}", hoja.nombre)), ..Default::default() };
        return (resumo, None);
    };

    let categoria = clasificar_aba(&hoja.nombre).unwrap_or(mapeo.categoria);
    let mut filas = hoja.filas.clone();
    preencher_para_baixo(&mut filas, mapeo);

    let ctx = ContextoHoja { min_celulas: opcoes.min_celulas, ..ContextoHoja::new(mapeo, &hoja.nombre, categoria) };
    let mut registros = Vec::new();
    let mut descartadas = 0;
    let mut falhas = 0;

    for (indice, fila) in filas.iter().enumerate().skip(mapeo.fila_inicio) {
        match procesar_fila(&ctx, fila, indice) {
            Ok(Some(registro)) => registros.push(registro),
            Ok(None) => {
                if !fila.iter().all(CeldaCruda::es_vacia) {
                    descartadas += 1;
                }
            }
            Err(e) => {
                warn!("aba '{}' linha {}: erro ao processar: {}", hoja.nombre, indice + 1, e);
                falhas += 1;
            }
        }
    }

    info!(
        "aba '{}' → {}: {} registros, {} descartadas, {} com erro",
        hoja.nombre,
        categoria,
        registros.len(),
        descartadas,
        falhas
    );

    let resumo = ResumoAba {
        rows: registros.len(),
        headers: mapeo.encabezados(),
        sample_data: registros.iter().take(opcoes.tamanho_amostra).cloned().collect(),
        error: None,
        category: Some(categoria),
        discarded_rows: descartadas,
        failed_rows: falhas,
    };
    (resumo, Some((categoria, registros)))
}

/// Importa todas las hojas del libro. Ninguna hoja puede impedir el
/// procesamiento de las demás; todas aparecen en el resumen.
pub fn importar_libro(libro: &LibroCrudo, opcoes: &OpcoesImportacao) -> ResultadoImportacao {
    importar_libro_con(libro, opcoes, buscar_mapeo)
}

fn importar_libro_con<'m, F>(libro: &LibroCrudo, opcoes: &OpcoesImportacao, buscar: F) -> ResultadoImportacao
where
    F: Fn(&str) -> Option<&'m MapeoHoja>,
{
    let mut sheets = Vec::with_capacity(libro.hojas.len());
    let mut registros: BTreeMap<Categoria, Vec<Registro>> = BTreeMap::new();
    let mut totals = totais_vacios();
    let mut nao_mapeadas = 0;
    let mut falhas = 0;

    for hoja in &libro.hojas {
        let (resumo, lote) = importar_aba(hoja, buscar(&hoja.nombre), opcoes);
        if resumo.error.is_some() {
            nao_mapeadas += 1;
        }
        falhas += resumo.failed_rows;
        if let Some((categoria, lote)) = lote {
            *totals.entry(categoria).or_insert(0) += lote.len();
            if !lote.is_empty() {
                registros.entry(categoria).or_default().extend(lote);
            }
        }
        sheets.push((hoja.nombre.clone(), resumo));
    }

    let total: usize = totals.values().sum();
    let mapeadas = sheets.len() - nao_mapeadas;
    let mut message = format!("{} registros importados de {} aba(s)", total, mapeadas);
    if nao_mapeadas > 0 {
        message.push_str(&format!("; {} aba(s) não mapeada(s)", nao_mapeadas));
    }
    if falhas > 0 {
        message.push_str(&format!("; {} linha(s) com erro", falhas));
    }
    let status = if nao_mapeadas > 0 || falhas > 0 { EstadoImportacao::Parcial } else { EstadoImportacao::Ok };

    ResultadoImportacao {
        resumo: ResumoImportacao { success: true, status, message, sheets, totals },
        registros,
    }
}

/// Lee el archivo y lo importa. Un libro ilegible produce `success: false`.
pub fn importar_arquivo<P: AsRef<Path>>(path: P, opcoes: &OpcoesImportacao) -> ResultadoImportacao {
    match ler_libro(path.as_ref()) {
        Ok(libro) => importar_libro(&libro, opcoes),
        Err(e) => {
            warn!("falha ao ler {:?}: {}", path.as_ref(), e);
            ResultadoImportacao::falha(format!("Erro ao processar arquivo: {}", e))
        }
    }
}

/// Importa el temporal de un upload. El formato y el nombre de hoja de un CSV
/// salen de `nome_original`, no del nombre aleatorio del temporal.
pub fn importar_upload(path: &Path, nome_original: &str, opcoes: &OpcoesImportacao) -> ResultadoImportacao {
    let libro = std::fs::read(path).map_err(ErroImportacao::from).and_then(|b| ler_libro_bytes(nome_original, b));
    match libro {
        Ok(libro) => importar_libro(&libro, opcoes),
        Err(e) => {
            warn!("falha ao ler upload '{}': {}", nome_original, e);
            ResultadoImportacao::falha(format!("Erro ao processar arquivo: {}", e))
        }
    }
}

/// Igual que `importar_arquivo` pero desde bytes en memoria.
pub fn importar_bytes(nome_arquivo: &str, bytes: Vec<u8>, opcoes: &OpcoesImportacao) -> ResultadoImportacao {
    match ler_libro_bytes(nome_arquivo, bytes) {
        Ok(libro) => importar_libro(&libro, opcoes),
        Err(e) => {
            warn!("falha ao ler '{}': {}", nome_arquivo, e);
            ResultadoImportacao::falha(format!("Erro ao processar arquivo: {}", e))
        }
    }
}
