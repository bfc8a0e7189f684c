use thiserror::Error;

use crate::models::{Campo, TipoCampo};

/// Errores del flujo de importación de planillas.
///
/// Sólo `Planilla`, `Csv`, `Io`, `FormatoNoSoportado` y `ArchivoMuyGrande`
/// son fatales para un upload completo; `TipoIncompativel` ocurre a nivel
/// de fila y el orquestador lo absorbe (la fila se descarta y se cuenta).
#[derive(Error, Debug)]
pub enum ErroImportacao {
    #[error("falha ao ler planilha: {0}")]
    Planilha(#[from] calamine::Error),

    #[error("falha ao ler CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("formato de arquivo não suportado: '{0}' (use .xlsx, .xls ou .csv)")]
    FormatoNoSoportado(String),

    #[error("arquivo excede o limite de {limite} bytes")]
    ArchivoMuyGrande { limite: usize },

    #[error("campo '{campo}' não aceita valor do tipo {tipo:?}")]
    TipoIncompativel { campo: Campo, tipo: TipoCampo },
}

/// Errores al insertar registros en la base externa (Postgres/Supabase).
#[derive(Error, Debug)]
pub enum ErroPersistencia {
    #[error("DATABASE_URL não configurada")]
    SinConfiguracion,

    #[error("{0}")]
    Postgres(#[from] postgres::Error),

    #[error("thread de persistência falhou: {0}")]
    Hilo(String),
}
