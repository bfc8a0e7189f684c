//! Agregados por fazenda y produto sobre los registros almacenados.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::Registro;

pub const SEM_FAZENDA: &str = "(sem fazenda)";
pub const SEM_PRODUTO: &str = "(sem produto)";

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumoFazenda {
    pub fazenda: String,
    pub produto: String,
    pub registros: usize,
    pub area_total_aplicada: f64,
    pub quantidade_aplicada: f64,
    /// Media sobre los registros que traen dosis aplicada.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose_media_aplicada: Option<f64>,
}

#[derive(Default)]
struct Acumulador {
    registros: usize,
    area: f64,
    quantidade: f64,
    soma_dose: f64,
    com_dose: usize,
}

/// Una fila por par (fazenda, produto), ordenada por fazenda y luego produto.
pub fn resumo_por_fazenda(registros: &[Registro]) -> Vec<ResumoFazenda> {
    let mut grupos: BTreeMap<(String, String), Acumulador> = BTreeMap::new();

    for r in registros {
        let chave = (
            r.fazenda.clone().unwrap_or_else(|| SEM_FAZENDA.to_string()),
            r.produto.clone().unwrap_or_else(|| SEM_PRODUTO.to_string()),
        );
        let acc = grupos.entry(chave).or_default();
        acc.registros += 1;
        acc.area += r.area_total_aplicada.unwrap_or(0.0);
        acc.quantidade += r.quantidade_aplicada.unwrap_or(0.0);
        if let Some(dose) = r.insum_dose_aplicada {
            acc.soma_dose += dose;
            acc.com_dose += 1;
        }
    }

    grupos
        .into_iter()
        .map(|((fazenda, produto), acc)| ResumoFazenda {
            fazenda,
            produto,
            registros: acc.registros,
            area_total_aplicada: acc.area,
            quantidade_aplicada: acc.quantidade,
            dose_media_aplicada: (acc.com_dose > 0).then(|| acc.soma_dose / acc.com_dose as f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Campo, Categoria, RegistroBuilder, ValorCampo};

    fn registro(fazenda: &str, area: f64, dose: Option<f64>) -> Registro {
        let mut b = RegistroBuilder::new("INSUMOS", 2);
        b.definir(Campo::Fazenda, ValorCampo::Texto(fazenda.into())).unwrap();
        b.definir(Campo::Produto, ValorCampo::Texto("KCL".into())).unwrap();
        b.definir(Campo::AreaTotalAplicada, ValorCampo::Numero(area)).unwrap();
        if let Some(d) = dose {
            b.definir(Campo::InsumDoseAplicada, ValorCampo::Numero(d)).unwrap();
        }
        b.construir(Categoria::InsumosFazendas)
    }

    #[test]
    fn agrupa_por_fazenda_y_produto() {
        let regs = vec![
            registro("SANTA IRENE", 10.0, Some(0.2)),
            registro("DANIELA", 5.0, None),
            registro("SANTA IRENE", 30.0, Some(0.4)),
        ];
        let resumo = resumo_por_fazenda(&regs);
        assert_eq!(resumo.len(), 2);
        assert_eq!(resumo[0].fazenda, "DANIELA");
        assert_eq!(resumo[0].dose_media_aplicada, None);
        assert_eq!(resumo[1].registros, 2);
        assert!((resumo[1].area_total_aplicada - 40.0).abs() < 1e-9);
        assert!((resumo[1].dose_media_aplicada.unwrap() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn vacio_sin_registros() {
        assert!(resumo_por_fazenda(&[]).is_empty());
    }
}
