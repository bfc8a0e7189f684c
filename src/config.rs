//! Configuración del servicio desde variables de entorno (`.env` vía dotenv).

use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use crate::excel::OpcoesImportacao;

pub const BIND_PADRAO: &str = "127.0.0.1:8080";
pub const MAX_UPLOAD_PADRAO: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind: String,
    pub max_upload_bytes: usize,
    /// Directorio de los archivos temporales de subida.
    pub upload_dir: PathBuf,
    pub tamanho_amostra: usize,
    pub min_celulas: usize,
    /// Sin URL el endpoint de persistencia responde 503.
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let opcoes = OpcoesImportacao::default();
        Config {
            bind: BIND_PADRAO.to_string(),
            max_upload_bytes: MAX_UPLOAD_PADRAO,
            upload_dir: std::env::temp_dir(),
            tamanho_amostra: opcoes.tamanho_amostra,
            min_celulas: opcoes.min_celulas,
            database_url: None,
        }
    }
}

impl Config {
    /// Carga `.env` (si existe) y lee el entorno del proceso.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let padrao = Config::default();
        let texto = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Config {
            bind: texto("INSUMOS_BIND").unwrap_or(padrao.bind),
            max_upload_bytes: numero(&texto, "INSUMOS_MAX_UPLOAD_BYTES", padrao.max_upload_bytes),
            upload_dir: texto("INSUMOS_UPLOAD_DIR").map(PathBuf::from).unwrap_or(padrao.upload_dir),
            tamanho_amostra: numero(&texto, "INSUMOS_SAMPLE_SIZE", padrao.tamanho_amostra),
            min_celulas: numero(&texto, "INSUMOS_MIN_CELULAS", padrao.min_celulas),
            database_url: texto("DATABASE_URL"),
        }
    }

    pub fn opcoes_importacao(&self) -> OpcoesImportacao {
        OpcoesImportacao { min_celulas: self.min_celulas, tamanho_amostra: self.tamanho_amostra }
    }
}

fn numero<T, F>(texto: &F, chave: &str, padrao: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match texto(chave) {
        None => padrao,
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!("{}='{}' inválido, usando {}", chave, v, padrao);
            padrao
        }),
    }
}
