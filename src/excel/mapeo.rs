//! Tablas de mapeo posicional: para cada tipo de hoja (identificada por una
//! subcadena de su nombre en mayúsculas) se define la fila donde empiezan los
//! datos y qué campo corresponde a cada columna.
//!
//! Estructura (ejemplo, hoja "OXIFERTIL"):
//! ```text
//! fila 0   título
//! fila 1   encabezados
//! fila 2.. datos: A processo | B subprocesso | C produto | D fazenda | E areaTalhao | ...
//! ```
//!
//! Cada columna lleva su etiqueta de tipo (`TipoCampo`); el procesador de
//! filas despacha sobre esa etiqueta y no sobre el nombre del campo.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::{Campo, Categoria, TipoCampo, ValorCampo};

/// Una columna de la planilla asociada a un campo del registro.
#[derive(Clone, Debug, Serialize)]
pub struct ColunaMapeada {
    pub indice: usize,
    pub campo: Campo,
    pub tipo: TipoCampo,
    /// Si la columna participa del relleno hacia abajo (celdas combinadas).
    pub propagar: bool,
}

impl ColunaMapeada {
    /// Columnas de identificación (texto, fecha, código) se propagan por defecto;
    /// las mediciones nunca.
    pub fn new(indice: usize, campo: Campo, tipo: TipoCampo) -> Self {
        ColunaMapeada { indice, campo, tipo, propagar: tipo != TipoCampo::Numero }
    }

    pub fn sem_propagar(mut self) -> Self {
        self.propagar = false;
        self
    }
}

/// Valor fijo que se inyecta cuando la fila no trae el campo.
#[derive(Clone, Debug, Serialize)]
pub struct Padrao {
    pub campo: Campo,
    pub valor: ValorCampo,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapeoHoja {
    pub clave: &'static str,
    /// Índice 0-based de la primera fila de datos.
    pub fila_inicio: usize,
    pub categoria: Categoria,
    pub columnas: Vec<ColunaMapeada>,
    pub padroes: Vec<Padrao>,
}

impl MapeoHoja {
    pub fn columna(&self, campo: Campo) -> Option<&ColunaMapeada> {
        self.columnas.iter().find(|c| c.campo == campo)
    }

    /// Nombres de campo en orden de columna (los "headers" del resumen).
    pub fn encabezados(&self) -> Vec<String> {
        let mut cols: Vec<&ColunaMapeada> = self.columnas.iter().collect();
        cols.sort_by_key(|c| c.indice);
        cols.into_iter().map(|c| c.campo.nome().to_string()).collect()
    }

    /// Verifica los invariantes de la tabla: índices únicos, campos únicos,
    /// etiqueta compatible con el campo y ninguna medición propagable.
    pub fn validar(&self) -> Result<(), String> {
        let mut indices = HashSet::new();
        let mut campos = HashSet::new();
        for c in &self.columnas {
            if !indices.insert(c.indice) {
                return Err(format!("{}: coluna {} repetida", self.clave, c.indice));
            }
            if !campos.insert(c.campo) {
                return Err(format!("{}: campo '{}' repetido", self.clave, c.campo));
            }
            if c.tipo != c.campo.tipo_nativo() {
                return Err(format!("{}: campo '{}' declarado como {:?}", self.clave, c.campo, c.tipo));
            }
            if c.propagar && c.tipo == TipoCampo::Numero {
                return Err(format!("{}: medição '{}' não pode ser propagada", self.clave, c.campo));
            }
        }
        for p in &self.padroes {
            if p.valor.tipo() != p.campo.tipo_nativo() {
                return Err(format!("{}: padrão de '{}' com tipo errado", self.clave, p.campo));
            }
        }
        Ok(())
    }
}

/// Fazenda por defecto según el sitio que aparece en el nombre de la hoja.
pub const PADROES_LOCAL: [(&str, &str); 2] = [("SANTA IRENE", "SANTA IRENE"), ("DANIELA", "DANIELA")];

pub fn fazenda_padrao_para(nome_aba: &str) -> Option<&'static str> {
    let upper = nome_aba.to_uppercase();
    PADROES_LOCAL
        .iter()
        .find(|(clave, _)| upper.contains(clave))
        .map(|(_, fazenda)| *fazenda)
}

fn col(indice: usize, campo: Campo) -> ColunaMapeada {
    ColunaMapeada::new(indice, campo, campo.tipo_nativo())
}

fn texto(campo: Campo, valor: &str) -> Padrao {
    Padrao { campo, valor: ValorCampo::Texto(valor.to_string()) }
}

// Layout común de las hojas de insumos por fazenda (genérica y por sitio)
fn columnas_insumos() -> Vec<ColunaMapeada> {
    vec![
        col(0, Campo::Os),
        col(1, Campo::Data),
        col(2, Campo::Fazenda),
        col(3, Campo::Talhao),
        col(4, Campo::Processo),
        col(5, Campo::Subprocesso),
        col(6, Campo::Produto),
        col(7, Campo::AreaTalhao),
        col(8, Campo::AreaTotalAplicada),
        col(9, Campo::DoseRecomendada),
        col(10, Campo::InsumDoseAplicada),
        col(11, Campo::QuantidadeAplicada),
        col(12, Campo::Frente),
        col(13, Campo::Observacao).sem_propagar(),
    ]
}

fn construir_mapeamentos() -> Vec<MapeoHoja> {
    vec![
        MapeoHoja {
            clave: "OXIFERTIL",
            fila_inicio: 2,
            categoria: Categoria::Oxifertil,
            columnas: vec![
                col(0, Campo::Processo),
                col(1, Campo::Subprocesso),
                col(2, Campo::Produto),
                col(3, Campo::Fazenda),
                col(4, Campo::AreaTalhao),
                col(5, Campo::AreaTotalAplicada),
                col(6, Campo::DoseRecomendada),
                col(7, Campo::InsumDoseAplicada),
                col(8, Campo::QuantidadeAplicada),
                col(9, Campo::Dif),
                col(10, Campo::Frente),
            ],
            padroes: vec![
                texto(Campo::Processo, "CANA DE ACUCAR"),
                texto(Campo::Subprocesso, "PLANTIO"),
                texto(Campo::Produto, "CALCARIO OXIFERTIL"),
                Padrao { campo: Campo::DoseRecomendada, valor: ValorCampo::Numero(0.15) },
            ],
        },
        MapeoHoja {
            clave: "SANTA IRENE",
            fila_inicio: 1,
            categoria: Categoria::InsumosFazendas,
            columnas: columnas_insumos(),
            padroes: Vec::new(),
        },
        MapeoHoja {
            clave: "DANIELA",
            fila_inicio: 1,
            categoria: Categoria::InsumosFazendas,
            columnas: columnas_insumos(),
            padroes: Vec::new(),
        },
        MapeoHoja {
            clave: "COMPOSTO",
            fila_inicio: 1,
            categoria: Categoria::Composto,
            columnas: vec![
                col(0, Campo::Data),
                col(1, Campo::Fazenda),
                col(2, Campo::Talhao),
                col(3, Campo::Produto),
                col(4, Campo::AreaTotalAplicada),
                col(5, Campo::DoseRecomendada),
                col(6, Campo::InsumDoseAplicada),
                col(7, Campo::QuantidadeAplicada),
                col(8, Campo::Frente),
            ],
            padroes: vec![texto(Campo::Produto, "COMPOSTO ORGANICO")],
        },
        MapeoHoja {
            clave: "VIAGENS",
            fila_inicio: 1,
            categoria: Categoria::ViagensAdubo,
            columnas: vec![
                col(0, Campo::Data),
                col(1, Campo::Placa),
                col(2, Campo::Motorista),
                col(3, Campo::Produto),
                col(4, Campo::Fazenda),
                col(5, Campo::Frente),
                col(6, Campo::Quantidade),
                col(7, Campo::Observacao).sem_propagar(),
            ],
            padroes: Vec::new(),
        },
        MapeoHoja {
            clave: "PLANTIO",
            fila_inicio: 1,
            categoria: Categoria::PlantioDiario,
            columnas: vec![
                col(0, Campo::Data),
                col(1, Campo::Fazenda),
                col(2, Campo::Frente),
                col(3, Campo::Talhao),
                col(4, Campo::Codigo),
                col(5, Campo::AreaPlantada),
                col(6, Campo::Observacao).sem_propagar(),
            ],
            padroes: Vec::new(),
        },
        MapeoHoja {
            clave: "INSUMOS",
            fila_inicio: 1,
            categoria: Categoria::InsumosFazendas,
            columnas: columnas_insumos(),
            padroes: Vec::new(),
        },
    ]
}

static MAPEAMENTOS: OnceLock<Vec<MapeoHoja>> = OnceLock::new();

/// Todas las tablas, en orden de prioridad de búsqueda.
pub fn mapeamentos() -> &'static [MapeoHoja] {
    MAPEAMENTOS.get_or_init(construir_mapeamentos)
}

/// Primer mapeo cuya clave está contenida (sin distinguir mayúsculas) en el
/// nombre de la hoja.
pub fn buscar_mapeo(nome_aba: &str) -> Option<&'static MapeoHoja> {
    let upper = nome_aba.to_uppercase();
    mapeamentos().iter().find(|m| upper.contains(m.clave))
}

/// Campos que pueden aparecer en los registros de una categoría (columnas de
/// la tabla destino), en orden estable.
pub fn campos_da_categoria(categoria: Categoria) -> Vec<Campo> {
    let mut campos: Vec<Campo> = mapeamentos()
        .iter()
        .filter(|m| m.categoria == categoria)
        .flat_map(|m| m.columnas.iter().map(|c| c.campo).chain(m.padroes.iter().map(|p| p.campo)))
        .collect();
    // las hojas por sitio inyectan fazenda aunque no tengan la columna
    campos.push(Campo::Fazenda);
    campos.sort();
    campos.dedup();
    campos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todas_las_tablas_son_validas() {
        for m in mapeamentos() {
            assert_eq!(m.validar(), Ok(()), "mapeo {} inválido", m.clave);
        }
    }

    #[test]
    fn validar_detecta_medicion_propagada() {
        let mut m = buscar_mapeo("OXIFERTIL").unwrap().clone();
        m.columnas[4].propagar = true;
        assert!(m.validar().is_err());
    }

    #[test]
    fn validar_detecta_indice_repetido() {
        let mut m = buscar_mapeo("PLANTIO").unwrap().clone();
        m.columnas.push(col(0, Campo::Os));
        assert!(m.validar().unwrap_err().contains("repetida"));
    }
}
