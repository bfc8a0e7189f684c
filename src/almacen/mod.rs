//! Almacén de registros importados.
//!
//! Los handlers reciben el almacén inyectado (`web::Data<Arc<dyn RepositorioImportacao>>`)
//! en lugar de usar estado global, así cada test arma su propio almacén.
//! Nada de esto sobrevive a un reinicio: sólo lo insertado en la base externa
//! (ver `persistencia`) es durable.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{Categoria, Registro};

pub trait RepositorioImportacao: Send + Sync {
    /// Agrega registros al final de la categoría.
    fn guardar(&self, categoria: Categoria, registros: Vec<Registro>);

    /// Copia de los registros de una categoría (o de todas si `None`).
    fn listar(&self, categoria: Option<Categoria>) -> Vec<Registro>;

    /// Saca todos los registros de la categoría (para persistirlos).
    fn retirar(&self, categoria: Categoria) -> Vec<Registro>;

    fn limpar(&self);

    fn totais(&self) -> BTreeMap<Categoria, usize>;
}

/// Implementación en memoria con un `Mutex` de corta duración.
#[derive(Debug, Default)]
pub struct AlmacenMemoria {
    datos: Mutex<BTreeMap<Categoria, Vec<Registro>>>,
}

impl AlmacenMemoria {
    pub fn new() -> Self {
        Self::default()
    }

    // un panic en otro handler no debe dejar el almacén inutilizable
    fn lock(&self) -> MutexGuard<'_, BTreeMap<Categoria, Vec<Registro>>> {
        self.datos.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RepositorioImportacao for AlmacenMemoria {
    fn guardar(&self, categoria: Categoria, registros: Vec<Registro>) {
        if registros.is_empty() {
            return;
        }
        self.lock().entry(categoria).or_default().extend(registros);
    }

    fn listar(&self, categoria: Option<Categoria>) -> Vec<Registro> {
        let guard = self.lock();
        match categoria {
            Some(c) => guard.get(&c).cloned().unwrap_or_default(),
            None => guard.values().flatten().cloned().collect(),
        }
    }

    fn retirar(&self, categoria: Categoria) -> Vec<Registro> {
        self.lock().remove(&categoria).unwrap_or_default()
    }

    fn limpar(&self) {
        self.lock().clear();
    }

    fn totais(&self) -> BTreeMap<Categoria, usize> {
        let guard = self.lock();
        Categoria::TODAS
            .into_iter()
            .map(|c| (c, guard.get(&c).map_or(0, Vec::len)))
            .collect()
    }
}
