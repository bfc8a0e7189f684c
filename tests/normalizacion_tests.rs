use chrono::NaiveDate;
use insumos::excel::fila::converter_celda;
use insumos::excel::normalizacion::{normalizar_texto, parsear_data};
use insumos::excel::{buscar_mapeo, clasificar_aba, mapeamentos, normalizar_celda, preencher_para_baixo, CeldaCruda};
use insumos::models::{Categoria, TipoCampo, Valor, ValorCampo};

fn numero(s: &str) -> Option<f64> {
    normalizar_texto(s).and_then(|v| v.como_numero())
}

#[test]
fn decimal_brasileno_con_miles() {
    assert_eq!(numero("1.234,56"), Some(1234.56));
    assert_eq!(numero("0,15"), Some(0.15));
    assert_eq!(numero("-0,1947647"), Some(-0.1947647));
    assert_eq!(numero("10,890002648"), Some(10.890002648));
}

#[test]
fn porcentaje_y_punto_decimal() {
    assert_eq!(numero("15%"), Some(15.0));
    assert_eq!(numero("90.16"), Some(90.16));
    assert_eq!(numero("  4001 "), Some(4001.0));
}

#[test]
fn marcadores_nulos_y_vacios() {
    for s in ["", "   ", "N/A", "n/a", "NaN", "-", "null", "NULL"] {
        assert_eq!(normalizar_celda(&CeldaCruda::from(s)), None, "'{}' debería ser nulo", s);
    }
    assert_eq!(normalizar_celda(&CeldaCruda::Vacia), None);
}

#[test]
fn texto_no_numerico_se_recorta() {
    assert_eq!(normalizar_texto("  SANTA NARCISA "), Some(Valor::Texto("SANTA NARCISA".into())));
    // "inf" no es una medición
    assert_eq!(normalizar_texto("inf"), Some(Valor::Texto("inf".into())));
}

#[test]
fn numeros_pasan_sin_cambios() {
    assert_eq!(normalizar_celda(&CeldaCruda::Numero(90.16)), Some(Valor::Numero(90.16)));
}

#[test]
fn fechas_brasilenas_y_serial() {
    let esperada = NaiveDate::from_ymd_opt(2024, 2, 1);
    assert_eq!(parsear_data(&CeldaCruda::from("01/02/2024")), esperada);
    assert_eq!(parsear_data(&CeldaCruda::from("2024-02-01")), esperada);
    assert_eq!(parsear_data(&CeldaCruda::Numero(45323.0)), esperada);
    assert_eq!(parsear_data(&CeldaCruda::from("SANTA IRENE")), None);
}

#[test]
fn texto_nunca_se_convierte_a_numero() {
    assert_eq!(
        converter_celda(&CeldaCruda::from("0,15"), TipoCampo::Texto),
        Some(ValorCampo::Texto("0,15".into()))
    );
    assert_eq!(
        converter_celda(&CeldaCruda::from("T-12"), TipoCampo::Identificador),
        Some(ValorCampo::Identificador(Valor::Texto("T-12".into())))
    );
    assert_eq!(
        converter_celda(&CeldaCruda::Numero(4001.0), TipoCampo::Identificador),
        Some(ValorCampo::Identificador(Valor::Numero(4001.0)))
    );
}

#[test]
fn clasificacion_respeta_prioridad() {
    assert_eq!(clasificar_aba("Oxifertil 2024"), Some(Categoria::Oxifertil));
    assert_eq!(clasificar_aba("INSUMOS SANTA IRENE"), Some(Categoria::InsumosFazendas));
    assert_eq!(clasificar_aba("composto orgânico"), Some(Categoria::Composto));
    assert_eq!(clasificar_aba("VIAGENS ADUBO"), Some(Categoria::ViagensAdubo));
    assert_eq!(clasificar_aba("Plantio Diário"), Some(Categoria::PlantioDiario));
    assert_eq!(clasificar_aba("Resumo"), None);
}

#[test]
fn mapeo_por_sitio_antes_que_generico() {
    assert_eq!(buscar_mapeo("INSUMOS DANIELA").map(|m| m.clave), Some("DANIELA"));
    assert_eq!(buscar_mapeo("Insumos").map(|m| m.clave), Some("INSUMOS"));
    assert!(buscar_mapeo("Resumo").is_none());
}

#[test]
fn ningun_mapeo_propaga_mediciones() {
    for m in mapeamentos() {
        for c in &m.columnas {
            if c.tipo == TipoCampo::Numero {
                assert!(!c.propagar, "{}: coluna {} não pode propagar", m.clave, c.campo);
            }
        }
    }
}

fn grilla_insumos() -> Vec<Vec<CeldaCruda>> {
    vec![
        vec![CeldaCruda::from("OS"), CeldaCruda::from("DATA"), CeldaCruda::from("FAZENDA")],
        vec![
            CeldaCruda::Numero(101.0),
            CeldaCruda::from("05/03/2024"),
            CeldaCruda::from("SANTA NARCISA"),
            CeldaCruda::from("T-1"),
            CeldaCruda::from("CANA"),
            CeldaCruda::from("COBERTURA"),
            CeldaCruda::from("KCL"),
            CeldaCruda::Numero(12.0),
            CeldaCruda::Numero(12.0),
            CeldaCruda::Numero(0.2),
        ],
        vec![
            CeldaCruda::Vacia,
            CeldaCruda::Vacia,
            CeldaCruda::Vacia,
            CeldaCruda::from("T-2"),
            CeldaCruda::Vacia,
            CeldaCruda::Vacia,
            CeldaCruda::Vacia,
            CeldaCruda::Numero(8.0),
        ],
        vec![],
        vec![CeldaCruda::Vacia, CeldaCruda::Vacia, CeldaCruda::Vacia, CeldaCruda::from("T-3")],
    ]
}

#[test]
fn relleno_es_idempotente() {
    let m = buscar_mapeo("INSUMOS").unwrap();
    let mut una = grilla_insumos();
    preencher_para_baixo(&mut una, m);
    let mut dos = una.clone();
    preencher_para_baixo(&mut dos, m);
    assert_eq!(una, dos);
}

#[test]
fn relleno_no_toca_mediciones_ni_separadores() {
    let m = buscar_mapeo("INSUMOS").unwrap();
    let mut filas = grilla_insumos();
    preencher_para_baixo(&mut filas, m);

    // identificación propagada
    assert_eq!(filas[2][2], CeldaCruda::from("SANTA NARCISA"));
    assert_eq!(filas[2][6], CeldaCruda::from("KCL"));
    // la medición faltante sigue vacía
    assert_eq!(filas[2].get(8).cloned().unwrap_or(CeldaCruda::Vacia), CeldaCruda::Vacia);
    // la fila vacía separa pero no corta la propagación
    assert!(filas[3].is_empty());
    assert_eq!(filas[4][2], CeldaCruda::from("SANTA NARCISA"));
    // el encabezado queda igual
    assert_eq!(filas[0].len(), 3);
}
