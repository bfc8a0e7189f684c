//! Normalización de celdas con reglas de locale brasileño (coma decimal,
//! punto de miles, porcentaje opcional) y parseo de fechas.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::excel::io::{serial_a_data, CeldaCruda};
use crate::models::{data_br, Valor};

/// Marcadores que las planillas usan para "sin dato".
const MARCADORES_NULOS: [&str; 4] = ["n/a", "nan", "-", "null"];

/// Normaliza una celda cruda:
/// - vacía / espacios / marcador nulo → `None`
/// - número → sin cambios
/// - texto con formato numérico brasileño ("1.234,56", "0,15", "15%") → número
/// - cualquier otro texto → texto recortado
pub fn normalizar_celda(celda: &CeldaCruda) -> Option<Valor> {
    match celda {
        CeldaCruda::Vacia => None,
        CeldaCruda::Numero(n) => Some(Valor::Numero(*n)),
        CeldaCruda::Texto(s) => normalizar_texto(s),
    }
}

/// Igual que `normalizar_celda` pero partiendo de texto.
pub fn normalizar_texto(s: &str) -> Option<Valor> {
    let recortado = s.trim();
    if recortado.is_empty() || es_marcador_nulo(recortado) {
        return None;
    }

    if recortado.contains(',') {
        let candidato = recortado.replace('.', "").replace(',', ".");
        if let Some(n) = parsear_float(&candidato) {
            return Some(Valor::Numero(n));
        }
    }

    let candidato = recortado.replace(',', ".").replace('%', "");
    match parsear_float(candidato.trim()) {
        Some(n) => Some(Valor::Numero(n)),
        None => Some(Valor::Texto(recortado.to_string())),
    }
}

pub fn es_marcador_nulo(s: &str) -> bool {
    let s = s.trim();
    MARCADORES_NULOS.iter().any(|m| s.eq_ignore_ascii_case(m))
}

// `f64::from_str` acepta "inf" o "infinity"; aquí sólo cuentan textos con dígitos
fn parsear_float(s: &str) -> Option<f64> {
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

const FORMATOS_DATA: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d", "%Y/%m/%d"];
const FORMATOS_DATA_HORA: [&str; 5] = [
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parsea una fecha desde DD/MM/YYYY, DD/MM/YY, variantes ISO o un número de
/// serie Excel. Devuelve `None` si la celda no representa una fecha.
pub fn parsear_data(celda: &CeldaCruda) -> Option<NaiveDate> {
    match celda {
        CeldaCruda::Vacia => None,
        CeldaCruda::Numero(n) => serial_a_data(*n),
        CeldaCruda::Texto(s) => parsear_data_texto(s),
    }
}

pub fn parsear_data_texto(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() || es_marcador_nulo(s) {
        return None;
    }

    // "%Y" acepta años de dos dígitos como año 24 d.C.; se filtran años absurdos
    let plausible = |d: &NaiveDate| (1900..=2100).contains(&d.year());

    for formato in FORMATOS_DATA {
        if let Ok(d) = NaiveDate::parse_from_str(s, formato) {
            if plausible(&d) {
                return Some(d);
            }
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%y") {
        return Some(d);
    }
    for formato in FORMATOS_DATA_HORA {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, formato) {
            if plausible(&dt.date()) {
                return Some(dt.date());
            }
        }
    }
    // texto numérico: número de serie guardado como texto ("45000")
    match normalizar_texto(s) {
        Some(Valor::Numero(n)) if n.fract() == 0.0 => serial_a_data(n),
        _ => None,
    }
}

/// Reemite una fecha en la forma canónica DD/MM/YYYY.
pub fn formatar_data(d: &NaiveDate) -> String {
    d.format(data_br::FORMATO).to_string()
}
