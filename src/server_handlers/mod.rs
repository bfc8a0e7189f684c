pub mod importacao;
pub mod registros;

pub use importacao::*;
pub use registros::*;
