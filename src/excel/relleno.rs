use crate::excel::io::CeldaCruda;
use crate::excel::mapeo::MapeoHoja;

/// Relleno hacia abajo para columnas de identificación.
///
/// Las planillas de origen combinan celdas (fazenda, produto, frente...) a lo
/// largo de varias filas; exportadas a grilla sólo la primera fila conserva el
/// valor. Aquí se reconstruye el valor por fila:
/// - sólo columnas con `propagar = true` (nunca mediciones)
/// - las filas anteriores a `fila_inicio` sólo alimentan el último valor
///   visto; nunca se modifican
/// - filas completamente vacías son separadores: no se rellenan y no cortan
///   la propagación
///
/// Es idempotente: aplicarlo dos veces da el mismo resultado.
pub fn preencher_para_baixo(filas: &mut [Vec<CeldaCruda>], mapeo: &MapeoHoja) {
    let vacias: Vec<bool> = filas.iter().map(|f| f.iter().all(CeldaCruda::es_vacia)).collect();

    for coluna in mapeo.columnas.iter().filter(|c| c.propagar) {
        let idx = coluna.indice;
        let mut ultimo: Option<CeldaCruda> = None;

        for (n, (fila, vacia)) in filas.iter_mut().zip(vacias.iter()).enumerate() {
            if *vacia {
                continue;
            }
            match fila.get(idx) {
                Some(celda) if !celda.es_vacia() => ultimo = Some(celda.clone()),
                _ if n < mapeo.fila_inicio => {}
                _ => {
                    if let Some(valor) = &ultimo {
                        if fila.len() <= idx {
                            fila.resize(idx + 1, CeldaCruda::Vacia);
                        }
                        fila[idx] = valor.clone();
                    }
                }
            }
        }
    }
}
