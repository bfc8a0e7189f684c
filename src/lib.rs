// Biblioteca raíz del crate `insumos`.
// Importa planillas de control de insumos agrícolas (xlsx/xls/csv), normaliza
// cada hoja según su tabla de mapeo y expone los registros vía HTTP.
pub mod config;
pub mod error;
pub mod excel;
pub mod models;
pub mod almacen;
pub mod persistencia;
pub mod reportes;
pub mod server;
pub mod server_handlers;

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
