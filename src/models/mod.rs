// Estructuras de datos principales: valores de celda, campos, categorías y
// el registro tipado que produce la importación.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::ErroImportacao;

/// Valor normalizado de una celda: número o texto. La ausencia (celda vacía
/// o marcador tipo "N/A") se representa con `Option::None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Valor {
    Numero(f64),
    Texto(String),
}

impl Valor {
    pub fn como_numero(&self) -> Option<f64> {
        match self {
            Valor::Numero(n) => Some(*n),
            Valor::Texto(_) => None,
        }
    }
}

impl fmt::Display for Valor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Valor::Numero(n) => write!(f, "{}", formatar_numero(*n)),
            Valor::Texto(s) => write!(f, "{}", s),
        }
    }
}

// Los enteros se emiten sin ".0" (frente 4001, não 4001.0)
impl Serialize for Valor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Valor::Numero(n) if es_entero(*n) => serializer.serialize_i64(*n as i64),
            Valor::Numero(n) => serializer.serialize_f64(*n),
            Valor::Texto(s) => serializer.serialize_str(s),
        }
    }
}

fn es_entero(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15
}

/// Representación textual de un número tal como lo mostraría la planilla.
pub fn formatar_numero(n: f64) -> String {
    if es_entero(n) {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Etiqueta de tipo explícita que acompaña a cada columna del mapeo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TipoCampo {
    /// Medición: se convierte a número y vale 0 cuando falta.
    Numero,
    /// Texto libre: nunca se convierte a número.
    Texto,
    /// Fecha, reemitida como DD/MM/YYYY.
    Data,
    /// Código/identificador: conserva el tipo crudo de la celda.
    Identificador,
}

/// Campos conocidos de los registros de insumos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Campo {
    Os,
    Codigo,
    Data,
    Processo,
    Subprocesso,
    Produto,
    Fazenda,
    Frente,
    Talhao,
    Placa,
    Motorista,
    Observacao,
    AreaTalhao,
    AreaTotalAplicada,
    DoseRecomendada,
    InsumDoseAplicada,
    QuantidadeAplicada,
    Dif,
    Quantidade,
    AreaPlantada,
}

impl Campo {
    pub const TODOS: [Campo; 20] = [
        Campo::Os,
        Campo::Codigo,
        Campo::Data,
        Campo::Processo,
        Campo::Subprocesso,
        Campo::Produto,
        Campo::Fazenda,
        Campo::Frente,
        Campo::Talhao,
        Campo::Placa,
        Campo::Motorista,
        Campo::Observacao,
        Campo::AreaTalhao,
        Campo::AreaTotalAplicada,
        Campo::DoseRecomendada,
        Campo::InsumDoseAplicada,
        Campo::QuantidadeAplicada,
        Campo::Dif,
        Campo::Quantidade,
        Campo::AreaPlantada,
    ];

    /// Nombre del campo en el JSON (camelCase).
    pub fn nome(&self) -> &'static str {
        match self {
            Campo::Os => "os",
            Campo::Codigo => "codigo",
            Campo::Data => "data",
            Campo::Processo => "processo",
            Campo::Subprocesso => "subprocesso",
            Campo::Produto => "produto",
            Campo::Fazenda => "fazenda",
            Campo::Frente => "frente",
            Campo::Talhao => "talhao",
            Campo::Placa => "placa",
            Campo::Motorista => "motorista",
            Campo::Observacao => "observacao",
            Campo::AreaTalhao => "areaTalhao",
            Campo::AreaTotalAplicada => "areaTotalAplicada",
            Campo::DoseRecomendada => "doseRecomendada",
            Campo::InsumDoseAplicada => "insumDoseAplicada",
            Campo::QuantidadeAplicada => "quantidadeAplicada",
            Campo::Dif => "dif",
            Campo::Quantidade => "quantidade",
            Campo::AreaPlantada => "areaPlantada",
        }
    }

    /// Nombre de la columna en la base externa (snake_case).
    pub fn coluna_sql(&self) -> &'static str {
        match self {
            Campo::AreaTalhao => "area_talhao",
            Campo::AreaTotalAplicada => "area_total_aplicada",
            Campo::DoseRecomendada => "dose_recomendada",
            Campo::InsumDoseAplicada => "insum_dose_aplicada",
            Campo::QuantidadeAplicada => "quantidade_aplicada",
            Campo::AreaPlantada => "area_plantada",
            otro => otro.nome(),
        }
    }

    /// Tipo con el que el campo se guarda en `Registro`.
    pub fn tipo_nativo(&self) -> TipoCampo {
        match self {
            Campo::Os | Campo::Codigo | Campo::Frente | Campo::Talhao | Campo::Placa => TipoCampo::Identificador,
            Campo::Data => TipoCampo::Data,
            Campo::Processo
            | Campo::Subprocesso
            | Campo::Produto
            | Campo::Fazenda
            | Campo::Motorista
            | Campo::Observacao => TipoCampo::Texto,
            Campo::AreaTalhao
            | Campo::AreaTotalAplicada
            | Campo::DoseRecomendada
            | Campo::InsumDoseAplicada
            | Campo::QuantidadeAplicada
            | Campo::Dif
            | Campo::Quantidade
            | Campo::AreaPlantada => TipoCampo::Numero,
        }
    }
}

impl fmt::Display for Campo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nome())
    }
}

impl Serialize for Campo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.nome())
    }
}

/// Grupo de registros que termina en una misma tabla destino.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Categoria {
    /// Aplicaciones de calcáreo/fertilizante Oxifertil.
    Oxifertil,
    /// Insumos por fazenda (incluye las hojas de cada sitio).
    InsumosFazendas,
    /// Aplicaciones de composto / adubo orgánico.
    Composto,
    /// Viajes de camiones de adubo.
    ViagensAdubo,
    /// Diario de plantío.
    PlantioDiario,
}

impl Categoria {
    pub const TODAS: [Categoria; 5] = [
        Categoria::Oxifertil,
        Categoria::InsumosFazendas,
        Categoria::Composto,
        Categoria::ViagensAdubo,
        Categoria::PlantioDiario,
    ];

    pub fn chave(&self) -> &'static str {
        match self {
            Categoria::Oxifertil => "oxifertil",
            Categoria::InsumosFazendas => "insumosFazendas",
            Categoria::Composto => "composto",
            Categoria::ViagensAdubo => "viagensAdubo",
            Categoria::PlantioDiario => "plantioDiario",
        }
    }

    pub fn tabela(&self) -> &'static str {
        match self {
            Categoria::Oxifertil => "insumos_oxifertil",
            Categoria::InsumosFazendas => "insumos_fazendas",
            Categoria::Composto => "insumos_composto",
            Categoria::ViagensAdubo => "viagens_adubo",
            Categoria::PlantioDiario => "plantio_diario",
        }
    }

    /// Acepta la clave camelCase o el nombre de la tabla.
    pub fn desde_chave(s: &str) -> Option<Categoria> {
        let s = s.trim();
        Categoria::TODAS
            .into_iter()
            .find(|c| c.chave().eq_ignore_ascii_case(s) || c.tabela().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Categoria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chave())
    }
}

/// Valor ya convertido según la etiqueta de tipo de su columna.
#[derive(Debug, Clone, PartialEq)]
pub enum ValorCampo {
    Numero(f64),
    Texto(String),
    Data(NaiveDate),
    Identificador(Valor),
}

impl ValorCampo {
    pub fn tipo(&self) -> TipoCampo {
        match self {
            ValorCampo::Numero(_) => TipoCampo::Numero,
            ValorCampo::Texto(_) => TipoCampo::Texto,
            ValorCampo::Data(_) => TipoCampo::Data,
            ValorCampo::Identificador(_) => TipoCampo::Identificador,
        }
    }
}

impl Serialize for ValorCampo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ValorCampo::Numero(n) => Valor::Numero(*n).serialize(serializer),
            ValorCampo::Texto(s) => serializer.serialize_str(s),
            ValorCampo::Data(d) => serializer.serialize_str(&d.format(data_br::FORMATO).to_string()),
            ValorCampo::Identificador(v) => v.serialize(serializer),
        }
    }
}

/// Un registro normalizado de la planilla.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registro {
    pub id: String,
    pub categoria: Categoria,
    pub aba_origem: String,
    /// Fila de la planilla (1-based, como la ve el usuario).
    pub linha_origem: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<Valor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codigo: Option<Valor>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "data_br::serialize")]
    pub data: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subprocesso: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub produto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fazenda: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frente: Option<Valor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talhao: Option<Valor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placa: Option<Valor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motorista: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_talhao: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_total_aplicada: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose_recomendada: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insum_dose_aplicada: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantidade_aplicada: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dif: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantidade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_plantada: Option<f64>,
}

impl Registro {
    fn vacio(aba: &str, linha: usize) -> Self {
        Registro {
            id: uuid::Uuid::new_v4().to_string(),
            categoria: Categoria::InsumosFazendas,
            aba_origem: aba.to_string(),
            linha_origem: linha,
            os: None,
            codigo: None,
            data: None,
            processo: None,
            subprocesso: None,
            produto: None,
            fazenda: None,
            frente: None,
            talhao: None,
            placa: None,
            motorista: None,
            observacao: None,
            area_talhao: None,
            area_total_aplicada: None,
            dose_recomendada: None,
            insum_dose_aplicada: None,
            quantidade_aplicada: None,
            dif: None,
            quantidade: None,
            area_plantada: None,
        }
    }

    fn slot_numero(&mut self, campo: Campo) -> Option<&mut Option<f64>> {
        match campo {
            Campo::AreaTalhao => Some(&mut self.area_talhao),
            Campo::AreaTotalAplicada => Some(&mut self.area_total_aplicada),
            Campo::DoseRecomendada => Some(&mut self.dose_recomendada),
            Campo::InsumDoseAplicada => Some(&mut self.insum_dose_aplicada),
            Campo::QuantidadeAplicada => Some(&mut self.quantidade_aplicada),
            Campo::Dif => Some(&mut self.dif),
            Campo::Quantidade => Some(&mut self.quantidade),
            Campo::AreaPlantada => Some(&mut self.area_plantada),
            _ => None,
        }
    }

    fn slot_texto(&mut self, campo: Campo) -> Option<&mut Option<String>> {
        match campo {
            Campo::Processo => Some(&mut self.processo),
            Campo::Subprocesso => Some(&mut self.subprocesso),
            Campo::Produto => Some(&mut self.produto),
            Campo::Fazenda => Some(&mut self.fazenda),
            Campo::Motorista => Some(&mut self.motorista),
            Campo::Observacao => Some(&mut self.observacao),
            _ => None,
        }
    }

    fn slot_identificador(&mut self, campo: Campo) -> Option<&mut Option<Valor>> {
        match campo {
            Campo::Os => Some(&mut self.os),
            Campo::Codigo => Some(&mut self.codigo),
            Campo::Frente => Some(&mut self.frente),
            Campo::Talhao => Some(&mut self.talhao),
            Campo::Placa => Some(&mut self.placa),
            _ => None,
        }
    }

    /// Lectura genérica de un campo (usada por persistencia y reportes).
    pub fn valor(&self, campo: Campo) -> Option<ValorCampo> {
        match campo {
            Campo::Os => self.os.clone().map(ValorCampo::Identificador),
            Campo::Codigo => self.codigo.clone().map(ValorCampo::Identificador),
            Campo::Frente => self.frente.clone().map(ValorCampo::Identificador),
            Campo::Talhao => self.talhao.clone().map(ValorCampo::Identificador),
            Campo::Placa => self.placa.clone().map(ValorCampo::Identificador),
            Campo::Data => self.data.map(ValorCampo::Data),
            Campo::Processo => self.processo.clone().map(ValorCampo::Texto),
            Campo::Subprocesso => self.subprocesso.clone().map(ValorCampo::Texto),
            Campo::Produto => self.produto.clone().map(ValorCampo::Texto),
            Campo::Fazenda => self.fazenda.clone().map(ValorCampo::Texto),
            Campo::Motorista => self.motorista.clone().map(ValorCampo::Texto),
            Campo::Observacao => self.observacao.clone().map(ValorCampo::Texto),
            Campo::AreaTalhao => self.area_talhao.map(ValorCampo::Numero),
            Campo::AreaTotalAplicada => self.area_total_aplicada.map(ValorCampo::Numero),
            Campo::DoseRecomendada => self.dose_recomendada.map(ValorCampo::Numero),
            Campo::InsumDoseAplicada => self.insum_dose_aplicada.map(ValorCampo::Numero),
            Campo::QuantidadeAplicada => self.quantidade_aplicada.map(ValorCampo::Numero),
            Campo::Dif => self.dif.map(ValorCampo::Numero),
            Campo::Quantidade => self.quantidade.map(ValorCampo::Numero),
            Campo::AreaPlantada => self.area_plantada.map(ValorCampo::Numero),
        }
    }
}

/// Constructor de `Registro` guiado por la tabla de mapeo: el procesador de
/// filas asigna campo por campo y el builder rechaza valores cuyo tipo no
/// corresponde al campo.
#[derive(Debug, Clone)]
pub struct RegistroBuilder {
    registro: Registro,
}

impl RegistroBuilder {
    pub fn new(aba: &str, linha: usize) -> Self {
        RegistroBuilder { registro: Registro::vacio(aba, linha) }
    }

    pub fn definir(&mut self, campo: Campo, valor: ValorCampo) -> Result<(), ErroImportacao> {
        let tipo = valor.tipo();
        let incompativel = || ErroImportacao::TipoIncompativel { campo, tipo };
        match valor {
            ValorCampo::Numero(n) => *self.registro.slot_numero(campo).ok_or_else(incompativel)? = Some(n),
            ValorCampo::Texto(s) => *self.registro.slot_texto(campo).ok_or_else(incompativel)? = Some(s),
            ValorCampo::Identificador(v) => {
                *self.registro.slot_identificador(campo).ok_or_else(incompativel)? = Some(v)
            }
            ValorCampo::Data(d) => {
                if campo != Campo::Data {
                    return Err(incompativel());
                }
                self.registro.data = Some(d);
            }
        }
        Ok(())
    }

    /// Asigna sólo si el campo todavía no tiene valor. Devuelve si asignó.
    pub fn definir_se_ausente(&mut self, campo: Campo, valor: ValorCampo) -> Result<bool, ErroImportacao> {
        if self.tem(campo) {
            return Ok(false);
        }
        self.definir(campo, valor)?;
        Ok(true)
    }

    pub fn tem(&self, campo: Campo) -> bool {
        self.registro.valor(campo).is_some()
    }

    pub fn numero(&self, campo: Campo) -> Option<f64> {
        match self.registro.valor(campo) {
            Some(ValorCampo::Numero(n)) => Some(n),
            _ => None,
        }
    }

    pub fn construir(mut self, categoria: Categoria) -> Registro {
        self.registro.categoria = categoria;
        self.registro
    }
}

/// Serialización de fechas en formato brasileño (DD/MM/YYYY).
pub mod data_br {
    use chrono::NaiveDate;
    use serde::Serializer;

    pub const FORMATO: &str = "%d/%m/%Y";

    pub fn serialize<S: Serializer>(data: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(d) => serializer.serialize_str(&d.format(FORMATO).to_string()),
            None => serializer.serialize_none(),
        }
    }
}
