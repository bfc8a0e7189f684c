//! Módulo `excel` dividido en submódulos para mantener el código organizado.
//!
//! Submódulos:
//! - `io`: lectura del libro (calamine / csv) y expansión de celdas combinadas
//! - `normalizacion`: normalización de celdas (decimales brasileños, fechas)
//! - `mapeo`: tablas de mapeo posicional por tipo de hoja
//! - `relleno`: relleno hacia abajo de columnas de identificación
//! - `fila`: conversión de una fila en `Registro`
//! - `importador`: clasificación de hojas y orquestación del import

/// Lectura de planillas y grilla cruda
pub mod io;

/// Reglas de normalización de celdas
pub mod normalizacion;

/// Tablas de mapeo (clave de hoja → columnas)
pub mod mapeo;

/// Relleno hacia abajo (celdas combinadas)
pub mod relleno;

/// Procesamiento de filas
pub mod fila;

/// Clasificación + orquestación
pub mod importador;

pub use importador::{
    clasificar_aba, importar_arquivo, importar_bytes, importar_libro, importar_upload, EstadoImportacao, OpcoesImportacao,
    ResultadoImportacao, ResumoAba, ResumoImportacao,
};
pub use io::{ler_libro, ler_libro_bytes, CeldaCruda, HojaCruda, LibroCrudo};
pub use mapeo::{buscar_mapeo, mapeamentos, MapeoHoja};
pub use normalizacion::{normalizar_celda, parsear_data};
pub use relleno::preencher_para_baixo;
pub use fila::{procesar_fila, ContextoHoja};
