use chrono::NaiveDate;
use insumos::excel::{importar_bytes, importar_libro, CeldaCruda, EstadoImportacao, HojaCruda, LibroCrudo, OpcoesImportacao};
use insumos::models::{Categoria, Valor};

fn t(s: &str) -> CeldaCruda {
    CeldaCruda::from(s)
}

fn n(v: f64) -> CeldaCruda {
    CeldaCruda::Numero(v)
}

fn libro(hojas: Vec<HojaCruda>) -> LibroCrudo {
    LibroCrudo { hojas }
}

fn hoja_oxifertil() -> HojaCruda {
    HojaCruda::new(
        "OXIFERTIL",
        vec![
            vec![t("CONTROLE DE APLICAÇÃO OXIFERTIL")],
            vec![t("PROCESSO"), t("SUBPROCESSO"), t("PRODUTO"), t("FAZENDA"), t("ÁREA TALHÃO"), t("ÁREA APLICADA")],
            vec![
                t("CANA DE ACUCAR"),
                t("PLANTIO"),
                t("CALCARIO OXIFERTIL"),
                t("SANTA NARCISA"),
                n(90.16),
                n(90.16),
                t("0,15"),
                t("0,1207853"),
                t("10,890002648"),
                t("-0,1947647"),
                n(4001.0),
            ],
        ],
    )
}

#[test]
fn escenario_oxifertil_produce_registro_exacto() {
    let r = importar_libro(&libro(vec![hoja_oxifertil()]), &OpcoesImportacao::default());
    assert!(r.resumo.success);
    assert_eq!(r.resumo.status, EstadoImportacao::Ok);

    let regs = &r.registros[&Categoria::Oxifertil];
    assert_eq!(regs.len(), 1);
    let reg = &regs[0];
    assert_eq!(reg.processo.as_deref(), Some("CANA DE ACUCAR"));
    assert_eq!(reg.subprocesso.as_deref(), Some("PLANTIO"));
    assert_eq!(reg.produto.as_deref(), Some("CALCARIO OXIFERTIL"));
    assert_eq!(reg.fazenda.as_deref(), Some("SANTA NARCISA"));
    assert_eq!(reg.area_talhao, Some(90.16));
    assert_eq!(reg.area_total_aplicada, Some(90.16));
    assert_eq!(reg.dose_recomendada, Some(0.15));
    assert_eq!(reg.insum_dose_aplicada, Some(0.1207853));
    assert_eq!(reg.quantidade_aplicada, Some(10.890002648));
    assert_eq!(reg.dif, Some(-0.1947647));
    assert_eq!(reg.frente, Some(Valor::Numero(4001.0)));
    assert_eq!(reg.linha_origem, 3);

    let json = serde_json::to_value(reg).unwrap();
    assert_eq!(json["frente"], serde_json::json!(4001));
    assert_eq!(json["doseRecomendada"], serde_json::json!(0.15));
}

#[test]
fn campos_derivados_son_consistentes() {
    let r = importar_libro(&libro(vec![hoja_oxifertil()]), &OpcoesImportacao::default());
    let reg = &r.registros[&Categoria::Oxifertil][0];
    let (area, dose, rec) = (reg.area_total_aplicada.unwrap(), reg.insum_dose_aplicada.unwrap(), reg.dose_recomendada.unwrap());
    assert!((reg.quantidade_aplicada.unwrap() - area * dose).abs() < 1e-6);
    assert!((reg.dif.unwrap() - (dose - rec) / rec).abs() < 1e-6);
}

#[test]
fn padroes_oxifertil_cuando_faltan_columnas() {
    let hoja = HojaCruda::new(
        "OXIFERTIL",
        vec![
            vec![],
            vec![],
            vec![
                CeldaCruda::Vacia,
                CeldaCruda::Vacia,
                CeldaCruda::Vacia,
                t("SANTA NARCISA"),
                n(50.0),
                n(40.0),
                CeldaCruda::Vacia,
                t("0,2"),
            ],
        ],
    );
    let r = importar_libro(&libro(vec![hoja]), &OpcoesImportacao::default());
    let reg = &r.registros[&Categoria::Oxifertil][0];
    assert_eq!(reg.processo.as_deref(), Some("CANA DE ACUCAR"));
    assert_eq!(reg.produto.as_deref(), Some("CALCARIO OXIFERTIL"));
    assert_eq!(reg.dose_recomendada, Some(0.15));
    // derivados desde la dosis por defecto
    assert!((reg.quantidade_aplicada.unwrap() - 8.0).abs() < 1e-9);
    assert!((reg.dif.unwrap() - (0.2 - 0.15) / 0.15).abs() < 1e-9);
}

#[test]
fn filas_con_pocas_celdas_se_descartan() {
    let hoja = HojaCruda::new(
        "VIAGENS ADUBO",
        vec![
            vec![t("DATA")],
            vec![t("10/01/2024"), CeldaCruda::Vacia, CeldaCruda::Vacia, CeldaCruda::Vacia, t("SANTA IRENE")],
        ],
    );
    let r = importar_libro(&libro(vec![hoja]), &OpcoesImportacao::default());
    assert_eq!(r.resumo.totals[&Categoria::ViagensAdubo], 0);
    assert_eq!(r.resumo.aba("VIAGENS ADUBO").unwrap().discarded_rows, 1);

    // con un mínimo menor la misma fila entra
    let laxo = OpcoesImportacao { min_celulas: 2, ..Default::default() };
    let hoja = HojaCruda::new(
        "VIAGENS ADUBO",
        vec![vec![t("DATA")], vec![t("10/01/2024"), CeldaCruda::Vacia, CeldaCruda::Vacia, CeldaCruda::Vacia, t("SANTA IRENE")]],
    );
    let r = importar_libro(&libro(vec![hoja]), &laxo);
    assert_eq!(r.resumo.totals[&Categoria::ViagensAdubo], 1);
}

#[test]
fn fila_sin_fazenda_ni_produto_se_descarta() {
    let hoja = HojaCruda::new(
        "PLANTIO DIARIO",
        vec![
            vec![t("DATA")],
            vec![t("01/02/2024"), CeldaCruda::Vacia, n(4001.0), t("T-1"), n(12.5)],
        ],
    );
    let r = importar_libro(&libro(vec![hoja]), &OpcoesImportacao::default());
    assert_eq!(r.resumo.totals[&Categoria::PlantioDiario], 0);
    assert!(r.registros.get(&Categoria::PlantioDiario).is_none());
}

#[test]
fn fila_vacia_no_genera_registro() {
    let hoja = HojaCruda::new(
        "COMPOSTO",
        vec![
            vec![t("DATA"), t("FAZENDA")],
            vec![t("01/02/2024"), t("SANTA NARCISA"), t("T-1"), CeldaCruda::Vacia, n(10.0), n(20.0), n(18.0)],
            vec![CeldaCruda::Vacia; 9],
            vec![CeldaCruda::Vacia, CeldaCruda::Vacia, t("T-2"), CeldaCruda::Vacia, n(5.0)],
        ],
    );
    let r = importar_libro(&libro(vec![hoja]), &OpcoesImportacao::default());
    let regs = &r.registros[&Categoria::Composto];
    assert_eq!(regs.len(), 2);
    assert_eq!(r.resumo.aba("COMPOSTO").unwrap().discarded_rows, 0);

    // la segunda fila hereda fecha y fazenda de la primera
    let segunda = &regs[1];
    assert_eq!(segunda.linha_origem, 4);
    assert_eq!(segunda.fazenda.as_deref(), Some("SANTA NARCISA"));
    assert_eq!(segunda.data, NaiveDate::from_ymd_opt(2024, 2, 1));
    assert_eq!(segunda.produto.as_deref(), Some("COMPOSTO ORGANICO"));
    // mediciones ausentes → 0
    assert_eq!(segunda.dose_recomendada, Some(0.0));
    assert_eq!(segunda.area_total_aplicada, Some(5.0));
}

#[test]
fn hoja_de_sitio_recibe_fazenda_por_defecto() {
    let hoja = HojaCruda::new(
        "SANTA IRENE",
        vec![
            vec![t("OS"), t("DATA")],
            vec![n(77.0), t("03/04/2024"), CeldaCruda::Vacia, t("T-9"), t("CANA"), t("COBERTURA"), t("KCL"), n(10.0), n(10.0)],
        ],
    );
    let r = importar_libro(&libro(vec![hoja]), &OpcoesImportacao::default());
    let reg = &r.registros[&Categoria::InsumosFazendas][0];
    assert_eq!(reg.fazenda.as_deref(), Some("SANTA IRENE"));
    assert_eq!(reg.os, Some(Valor::Numero(77.0)));
}

#[test]
fn fila_de_titulo_alimenta_la_primera_fila_de_datos() {
    let hoja = HojaCruda::new(
        "OXIFERTIL",
        vec![
            vec![t("CONTROLE")],
            vec![t("CANA DE ACUCAR"), t("PLANTIO"), t("CALCARIO"), t("SANTA NARCISA")],
            vec![CeldaCruda::Vacia, CeldaCruda::Vacia, CeldaCruda::Vacia, CeldaCruda::Vacia, n(90.0), n(90.0)],
        ],
    );
    let r = importar_libro(&libro(vec![hoja]), &OpcoesImportacao::default());
    let regs = &r.registros[&Categoria::Oxifertil];
    assert_eq!(regs.len(), 1);
    assert_eq!(regs[0].linha_origem, 3);
    assert_eq!(regs[0].fazenda.as_deref(), Some("SANTA NARCISA"));
    // el valor heredado gana sobre el padrão de la categoría
    assert_eq!(regs[0].produto.as_deref(), Some("CALCARIO"));
}

#[test]
fn hoja_no_mapeada_no_detiene_las_demas() {
    let resumo_hoja = HojaCruda::new("Resumo", vec![vec![t("qualquer"), t("coisa"), t("aqui")]]);
    let r = importar_libro(&libro(vec![resumo_hoja, hoja_oxifertil()]), &OpcoesImportacao::default());

    assert!(r.resumo.success);
    assert_eq!(r.resumo.status, EstadoImportacao::Parcial);
    let aba = r.resumo.aba("Resumo").unwrap();
    assert_eq!(aba.error.as_deref(), Some("Aba não mapeada: Resumo"));
    assert_eq!(aba.rows, 0);
    assert_eq!(r.resumo.totals[&Categoria::Oxifertil], 1);

    // las hojas aparecen en el orden del libro
    let nomes: Vec<&str> = r.resumo.sheets.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(nomes, vec!["Resumo", "OXIFERTIL"]);
}

#[test]
fn rows_coincide_con_registros_aceptados() {
    let r = importar_libro(&libro(vec![hoja_oxifertil()]), &OpcoesImportacao::default());
    let aba = r.resumo.aba("OXIFERTIL").unwrap();
    assert_eq!(aba.rows, r.registros[&Categoria::Oxifertil].len());
    assert_eq!(aba.headers.first().map(String::as_str), Some("processo"));
    assert_eq!(aba.sample_data.len(), 1);

    let total: usize = r.resumo.totals.values().sum();
    let guardados: usize = r.registros.values().map(Vec::len).sum();
    assert_eq!(total, guardados);
}

#[test]
fn resumen_serializa_con_claves_esperadas() {
    let r = importar_libro(&libro(vec![hoja_oxifertil()]), &OpcoesImportacao::default());
    let json = serde_json::to_value(&r.resumo).unwrap();
    assert_eq!(json["success"], serde_json::json!(true));
    assert_eq!(json["status"], serde_json::json!("ok"));
    assert_eq!(json["sheets"]["OXIFERTIL"]["rows"], serde_json::json!(1));
    assert_eq!(json["totals"]["oxifertil"], serde_json::json!(1));
    assert_eq!(json["totals"]["plantioDiario"], serde_json::json!(0));
}

#[test]
fn csv_con_punto_y_coma() {
    let csv = "DATA;PLACA;MOTORISTA;PRODUTO;FAZENDA;FRENTE;QUANTIDADE;OBS\n\
               10/01/2024;ABC1D23;JOSE;KCL;SANTA NARCISA;4001;1.234,5;\n\
               ;;;;;;980;segunda viagem\n";
    let r = importar_bytes("VIAGENS ADUBO.csv", csv.as_bytes().to_vec(), &OpcoesImportacao::default());
    assert!(r.resumo.success);
    let regs = &r.registros[&Categoria::ViagensAdubo];
    assert_eq!(regs.len(), 2);
    assert_eq!(regs[0].quantidade, Some(1234.5));
    assert_eq!(regs[0].placa, Some(Valor::Texto("ABC1D23".into())));
    // el código entero del CSV queda igual que la celda numérica de un xlsx
    assert_eq!(regs[0].frente, Some(Valor::Numero(4001.0)));
    assert_eq!(serde_json::to_value(&regs[0]).unwrap()["frente"], serde_json::json!(4001));
    assert_eq!(regs[0].observacao, None);

    // la segunda línea hereda la identificación de la primera
    assert_eq!(regs[1].fazenda.as_deref(), Some("SANTA NARCISA"));
    assert_eq!(regs[1].placa, Some(Valor::Texto("ABC1D23".into())));
    assert_eq!(regs[1].quantidade, Some(980.0));
    assert_eq!(regs[1].observacao.as_deref(), Some("segunda viagem"));
}

#[test]
fn libro_ilegible_devuelve_fallo() {
    let r = importar_bytes("planilha.xlsx", b"isto nao e um zip".to_vec(), &OpcoesImportacao::default());
    assert!(!r.resumo.success);
    assert_eq!(r.resumo.status, EstadoImportacao::Erro);
    assert!(r.resumo.message.starts_with("Erro ao processar arquivo"));
    assert!(r.registros.is_empty());

    let r = importar_bytes("planilha.pdf", vec![1, 2, 3], &OpcoesImportacao::default());
    assert!(!r.resumo.success);
}
