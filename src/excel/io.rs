use calamine::{open_workbook_auto_from_rs, Data, Dimensions, Range, Reader, Sheets};
use chrono::{Duration, NaiveDate};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::ErroImportacao;
use crate::models::data_br;

/// Celda cruda tal como sale de la planilla (texto, número o vacía).
#[derive(Debug, Clone, PartialEq)]
pub enum CeldaCruda {
    Vacia,
    Numero(f64),
    Texto(String),
}

impl CeldaCruda {
    /// Vacía o sólo espacios.
    pub fn es_vacia(&self) -> bool {
        match self {
            CeldaCruda::Vacia => true,
            CeldaCruda::Numero(_) => false,
            CeldaCruda::Texto(s) => s.trim().is_empty(),
        }
    }
}

impl From<&str> for CeldaCruda {
    fn from(s: &str) -> Self {
        CeldaCruda::Texto(s.to_string())
    }
}

impl From<f64> for CeldaCruda {
    fn from(n: f64) -> Self {
        CeldaCruda::Numero(n)
    }
}

/// Una hoja ya expandida: filas en posición absoluta (fila 0 = fila 1 de la
/// planilla) y celdas combinadas replicadas en todo su rango.
#[derive(Debug, Clone, PartialEq)]
pub struct HojaCruda {
    pub nombre: String,
    pub filas: Vec<Vec<CeldaCruda>>,
}

impl HojaCruda {
    pub fn new(nombre: &str, filas: Vec<Vec<CeldaCruda>>) -> Self {
        HojaCruda { nombre: nombre.to_string(), filas }
    }
}

/// Libro completo en memoria; se descarta después de procesarlo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibroCrudo {
    pub hojas: Vec<HojaCruda>,
}

/// Convierte un `Data` de calamine a `CeldaCruda`.
pub fn data_to_celda(d: &Data) -> CeldaCruda {
    match d {
        Data::String(s) => CeldaCruda::Texto(s.clone()),
        Data::Float(f) => CeldaCruda::Numero(*f),
        Data::Int(i) => CeldaCruda::Numero(*i as f64),
        Data::Bool(b) => CeldaCruda::Texto(b.to_string()),
        Data::Empty => CeldaCruda::Vacia,
        Data::Error(_) => CeldaCruda::Vacia,
        // fechas Excel: emitir ya en DD/MM/YYYY para que el normalizador las trate como texto
        // as_datetime respeta el sistema 1904 del libro; el serial queda de respaldo
        Data::DateTime(dt) if dt.is_datetime() => {
            match dt.as_datetime().map(|f| f.date()).or_else(|| serial_a_data(dt.as_f64())) {
                Some(fecha) => CeldaCruda::Texto(fecha.format(data_br::FORMATO).to_string()),
                None => CeldaCruda::Numero(dt.as_f64()),
            }
        }
        Data::DateTime(dt) => CeldaCruda::Numero(dt.as_f64()),
        Data::DateTimeIso(s) => CeldaCruda::Texto(s.clone()),
        Data::DurationIso(s) => CeldaCruda::Texto(s.clone()),
    }
}

/// Número de serie Excel (sistema 1900) a fecha. Acepta sólo el rango válido de Excel.
pub fn serial_a_data(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    // 1899-12-30 absorbe el bug del 29/02/1900 de Lotus para fechas posteriores a marzo de 1900
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Convierte un `Range` de calamine en filas absolutas, rellenando con celdas
/// vacías las filas/columnas anteriores al inicio del rango usado.
pub fn range_a_filas(range: &Range<Data>) -> Vec<Vec<CeldaCruda>> {
    let (fila0, col0) = match range.start() {
        Some((f, c)) => (f as usize, c as usize),
        None => return Vec::new(),
    };

    let mut filas: Vec<Vec<CeldaCruda>> = vec![Vec::new(); fila0];
    for r in range.rows() {
        let mut fila = vec![CeldaCruda::Vacia; col0];
        fila.extend(r.iter().map(data_to_celda));
        filas.push(fila);
    }
    filas
}

/// Replica el valor de la celda superior izquierda de cada región combinada
/// en todas las celdas que cubre.
pub fn expandir_combinadas(filas: &mut Vec<Vec<CeldaCruda>>, regiones: &[Dimensions]) {
    for region in regiones {
        let (f0, c0) = (region.start.0 as usize, region.start.1 as usize);
        let (f1, c1) = (region.end.0 as usize, region.end.1 as usize);
        let valor = match filas.get(f0).and_then(|f| f.get(c0)) {
            Some(v) if !v.es_vacia() => v.clone(),
            _ => continue,
        };
        if filas.len() <= f1 {
            filas.resize(f1 + 1, Vec::new());
        }
        for fila in filas.iter_mut().take(f1 + 1).skip(f0) {
            if fila.len() <= c1 {
                fila.resize(c1 + 1, CeldaCruda::Vacia);
            }
            for celda in fila.iter_mut().take(c1 + 1).skip(c0) {
                *celda = valor.clone();
            }
        }
    }
}

/// Lee un libro desde bytes. `nombre_archivo` decide el formato por extensión
/// (.xlsx/.xlsm/.xls/.xlsb/.ods vía calamine, .csv vía crate csv).
pub fn ler_libro_bytes(nombre_archivo: &str, bytes: Vec<u8>) -> Result<LibroCrudo, ErroImportacao> {
    let extension = Path::new(nombre_archivo)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => {
            let nombre_hoja = Path::new(nombre_archivo)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("CSV");
            Ok(LibroCrudo { hojas: vec![ler_csv(nombre_hoja, &bytes)?] })
        }
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => ler_planilha(bytes),
        otro => Err(ErroImportacao::FormatoNoSoportado(otro.to_string())),
    }
}

/// Lee un libro desde disco (ruta del archivo temporal del upload).
pub fn ler_libro<P: AsRef<Path>>(path: P) -> Result<LibroCrudo, ErroImportacao> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let nombre = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
    ler_libro_bytes(nombre, bytes)
}

fn ler_planilha(bytes: Vec<u8>) -> Result<LibroCrudo, ErroImportacao> {
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    // Sólo xlsx expone las regiones combinadas
    if let Sheets::Xlsx(ref mut xlsx) = workbook {
        if let Err(e) = xlsx.load_merged_regions() {
            warn!("não foi possível carregar células mescladas: {}", e);
        }
    }

    let nombres = workbook.sheet_names().to_owned();
    let mut hojas = Vec::with_capacity(nombres.len());
    for nombre in nombres.iter() {
        let range = workbook.worksheet_range(nombre)?;
        let mut filas = range_a_filas(&range);

        let regiones: Vec<Dimensions> = match workbook {
            Sheets::Xlsx(ref mut xlsx) => xlsx
                .worksheet_merge_cells(nombre)
                .unwrap_or(Ok(Vec::new()))
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        if !regiones.is_empty() {
            debug!("aba '{}': {} regiões mescladas", nombre, regiones.len());
            expandir_combinadas(&mut filas, &regiones);
        }
        hojas.push(HojaCruda { nombre: nombre.clone(), filas });
    }
    Ok(LibroCrudo { hojas })
}

/// Las exportaciones brasileñas suelen usar ';' como separador; se elige el
/// separador más frecuente en la primera línea.
fn detectar_delimitador(bytes: &[u8]) -> u8 {
    let primera = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let puntos_coma = primera.iter().filter(|b| **b == b';').count();
    let comas = primera.iter().filter(|b| **b == b',').count();
    if puntos_coma >= comas && puntos_coma > 0 { b';' } else { b',' }
}

fn ler_csv(nombre_hoja: &str, bytes: &[u8]) -> Result<HojaCruda, ErroImportacao> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(detectar_delimitador(bytes))
        .from_reader(bytes);

    let mut filas = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let fila = record
            .iter()
            .map(|campo| {
                let texto = String::from_utf8_lossy(campo);
                if texto.trim().is_empty() {
                    CeldaCruda::Vacia
                } else {
                    CeldaCruda::Texto(texto.into_owned())
                }
            })
            .collect();
        filas.push(fila);
    }
    Ok(HojaCruda::new(nombre_hoja, filas))
}
