use tracing::debug;

use crate::error::ErroImportacao;
use crate::excel::io::CeldaCruda;
use crate::excel::mapeo::{fazenda_padrao_para, MapeoHoja};
use crate::excel::normalizacion::{es_marcador_nulo, normalizar_celda, parsear_data};
use crate::models::{formatar_numero, Campo, Categoria, Registro, RegistroBuilder, TipoCampo, Valor, ValorCampo};

/// Mínimo de celdas no vacías para considerar una fila como dato.
pub const MIN_CELULAS_PADRAO: usize = 3;

/// Datos fijos de la hoja que se está procesando (se arma una vez por hoja).
#[derive(Clone, Debug)]
pub struct ContextoHoja<'a> {
    pub mapeo: &'a MapeoHoja,
    pub nome_aba: &'a str,
    pub categoria: Categoria,
    pub min_celulas: usize,
}

impl<'a> ContextoHoja<'a> {
    pub fn new(mapeo: &'a MapeoHoja, nome_aba: &'a str, categoria: Categoria) -> Self {
        ContextoHoja { mapeo, nome_aba, categoria, min_celulas: MIN_CELULAS_PADRAO }
    }
}

/// Convierte una fila (ya rellenada hacia abajo) en un `Registro`.
///
/// Devuelve `Ok(None)` cuando la fila no es utilizable:
/// - menos de `min_celulas` celdas con contenido
/// - línea de totales (rótulo "TOTAL"/"SUBTOTAL" en la primera columna de identificación)
/// - sin fazenda ni produto después de mapear y aplicar padrões
///
/// `indice` es 0-based; el registro guarda la fila 1-based de la planilla.
pub fn procesar_fila(ctx: &ContextoHoja<'_>, fila: &[CeldaCruda], indice: usize) -> Result<Option<Registro>, ErroImportacao> {
    let preenchidas = fila.iter().filter(|c| !c.es_vacia()).count();
    if preenchidas < ctx.min_celulas {
        return Ok(None);
    }
    if es_linha_total(ctx.mapeo, fila) {
        debug!("aba '{}' linha {}: linha de total ignorada", ctx.nome_aba, indice + 1);
        return Ok(None);
    }

    let mapeo = ctx.mapeo;
    let mut builder = RegistroBuilder::new(ctx.nome_aba, indice + 1);

    for coluna in &mapeo.columnas {
        let Some(celda) = fila.get(coluna.indice) else { continue };
        if let Some(valor) = converter_celda(celda, coluna.tipo) {
            builder.definir(coluna.campo, valor)?;
        }
    }

    for padrao in &mapeo.padroes {
        builder.definir_se_ausente(padrao.campo, padrao.valor.clone())?;
    }
    if let Some(fazenda) = fazenda_padrao_para(ctx.nome_aba) {
        builder.definir_se_ausente(Campo::Fazenda, ValorCampo::Texto(fazenda.to_string()))?;
    }

    derivar_campos(mapeo, &mut builder)?;

    // mediciones del mapeo nunca quedan ausentes
    for coluna in mapeo.columnas.iter().filter(|c| c.tipo == TipoCampo::Numero) {
        builder.definir_se_ausente(coluna.campo, ValorCampo::Numero(0.0))?;
    }

    if !builder.tem(Campo::Fazenda) && !builder.tem(Campo::Produto) {
        debug!("aba '{}' linha {}: sem fazenda nem produto", ctx.nome_aba, indice + 1);
        return Ok(None);
    }

    Ok(Some(builder.construir(ctx.categoria)))
}

/// Convierte una celda según la etiqueta de tipo de su columna.
pub fn converter_celda(celda: &CeldaCruda, tipo: TipoCampo) -> Option<ValorCampo> {
    match tipo {
        TipoCampo::Numero => normalizar_celda(celda).and_then(|v| v.como_numero()).map(ValorCampo::Numero),
        // texto nunca se convierte a número, aunque lo parezca ("04-30-10", "4001")
        TipoCampo::Texto => match celda {
            CeldaCruda::Vacia => None,
            CeldaCruda::Numero(n) => Some(ValorCampo::Texto(formatar_numero(*n))),
            CeldaCruda::Texto(s) => texto_util(s).map(|t| ValorCampo::Texto(t.to_string())),
        },
        TipoCampo::Data => parsear_data(celda).map(ValorCampo::Data),
        TipoCampo::Identificador => match celda {
            CeldaCruda::Vacia => None,
            CeldaCruda::Numero(n) => Some(ValorCampo::Identificador(Valor::Numero(*n))),
            CeldaCruda::Texto(s) => texto_util(s).map(|t| ValorCampo::Identificador(identificador_de_texto(t))),
        },
    }
}

/// Un código entero escrito como texto ("4001" en un CSV) vale lo mismo que la
/// celda numérica de un xlsx. Ceros a la izquierda ("0042") y códigos con
/// separadores ("04-30-10") quedan como texto.
fn identificador_de_texto(t: &str) -> Valor {
    let entero = t.bytes().all(|b| b.is_ascii_digit()) && t.len() <= 15 && (t == "0" || !t.starts_with('0'));
    match t.parse::<f64>() {
        Ok(n) if entero => Valor::Numero(n),
        _ => Valor::Texto(t.to_string()),
    }
}

fn texto_util(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() || es_marcador_nulo(t) { None } else { Some(t) }
}

/// Rótulos que marcan una línea de totales en la primera columna de identificación.
const ROTULOS_TOTAL: [&str; 4] = ["TOTAL", "TOTAL GERAL", "SUBTOTAL", "SUB-TOTAL"];

/// Sólo mira la primera columna de identificación del mapeo; el rótulo tiene
/// que ser exacto ("Total aplicado..." en una observação no cuenta).
fn es_linha_total(mapeo: &MapeoHoja, fila: &[CeldaCruda]) -> bool {
    let Some(coluna) = mapeo.columnas.iter().filter(|c| c.tipo != TipoCampo::Numero).min_by_key(|c| c.indice) else {
        return false;
    };
    match fila.get(coluna.indice) {
        Some(CeldaCruda::Texto(s)) => {
            let rotulo = s.trim().trim_end_matches(':').trim_end().to_uppercase();
            ROTULOS_TOTAL.contains(&rotulo.as_str())
        }
        _ => false,
    }
}

/// Aritmética de dosis cuando la planilla no trae el valor calculado:
/// - quantidadeAplicada = areaTotalAplicada × insumDoseAplicada
/// - dif = (insumDoseAplicada − doseRecomendada) / doseRecomendada
///
/// Sólo se deriva un campo si el mapeo tiene columna para él.
fn derivar_campos(mapeo: &MapeoHoja, builder: &mut RegistroBuilder) -> Result<(), ErroImportacao> {
    let dose_aplicada = builder.numero(Campo::InsumDoseAplicada);

    if mapeo.columna(Campo::QuantidadeAplicada).is_some() && !builder.tem(Campo::QuantidadeAplicada) {
        if let (Some(area), Some(dose)) = (builder.numero(Campo::AreaTotalAplicada), dose_aplicada) {
            builder.definir(Campo::QuantidadeAplicada, ValorCampo::Numero(area * dose))?;
        }
    }

    if mapeo.columna(Campo::Dif).is_some() && !builder.tem(Campo::Dif) {
        if let (Some(recomendada), Some(aplicada)) = (builder.numero(Campo::DoseRecomendada), dose_aplicada) {
            if recomendada != 0.0 {
                builder.definir(Campo::Dif, ValorCampo::Numero((aplicada - recomendada) / recomendada))?;
            }
        }
    }
    Ok(())
}
