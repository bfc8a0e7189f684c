use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::almacen::RepositorioImportacao;
use crate::config::Config;
use crate::excel::importador::CLASIFICACION;
use crate::excel::mapeamentos;
use crate::models::Categoria;
use crate::persistencia::DestinoPostgres;
use crate::reportes::resumo_por_fazenda;

type Almacen = web::Data<Arc<dyn RepositorioImportacao>>;

/// Lee `?categoria=` aceptando la clave o el nombre de tabla.
/// `Ok(None)` cuando el parámetro no viene.
fn categoria_da_query(query: &HashMap<String, String>) -> Result<Option<Categoria>, HttpResponse> {
    match query.get("categoria").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Categoria::desde_chave(s).map(Some).ok_or_else(|| {
            let validas: Vec<&str> = Categoria::TODAS.iter().map(|c| c.chave()).collect();
            HttpResponse::BadRequest().json(json!({"error": format!("categoria desconhecida: {}", s), "validas": validas}))
        }),
    }
}

/// GET /api/registros?categoria=oxifertil&limite=100
pub async fn listar_registros(query: web::Query<HashMap<String, String>>, almacen: Almacen) -> impl Responder {
    let categoria = match categoria_da_query(&query) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let limite = query.get("limite").and_then(|s| s.parse::<usize>().ok());

    let registros = almacen.listar(categoria);
    let total = registros.len();
    let registros: Vec<_> = match limite {
        Some(n) => registros.into_iter().take(n).collect(),
        None => registros,
    };

    HttpResponse::Ok().json(json!({
        "categoria": categoria,
        "total": total,
        "registros": registros,
    }))
}

/// DELETE /api/registros
pub async fn limpar_registros(almacen: Almacen) -> impl Responder {
    let removidos: usize = almacen.totais().values().sum();
    almacen.limpar();
    info!("almacén limpo ({} registros)", removidos);
    HttpResponse::Ok().json(json!({"status": "ok", "removidos": removidos}))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultadoPersistencia {
    pub categoria: Categoria,
    pub tabela: &'static str,
    pub inseridos: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erro: Option<String>,
}

/// POST /api/registros/persistir?categoria=composto
///
/// Cada categoría se inserta por separado; una falla no revierte las
/// anteriores y sus registros vuelven al almacén.
pub async fn persistir_registros(
    query: web::Query<HashMap<String, String>>,
    almacen: Almacen,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(url) = config.database_url.as_deref() else {
        return HttpResponse::ServiceUnavailable()
            .json(json!({"success": false, "error": crate::error::ErroPersistencia::SinConfiguracion.to_string()}));
    };
    let categorias = match categoria_da_query(&query) {
        Ok(Some(c)) => vec![c],
        Ok(None) => Categoria::TODAS.to_vec(),
        Err(resp) => return resp,
    };

    let destino = DestinoPostgres::new(url);
    let mut resultados = Vec::new();

    for categoria in categorias {
        let registros = almacen.retirar(categoria);
        if registros.is_empty() {
            continue;
        }
        let d = destino.clone();
        let bloque = web::block(move || {
            let r = d.inserir(categoria, &registros);
            (r, registros)
        })
        .await;

        let resultado = match bloque {
            Ok((Ok(inseridos), _)) => ResultadoPersistencia { categoria, tabela: categoria.tabela(), inseridos, erro: None },
            Ok((Err(e), registros)) => {
                warn!("falha ao persistir {}: {}", categoria, e);
                almacen.guardar(categoria, registros);
                ResultadoPersistencia { categoria, tabela: categoria.tabela(), inseridos: 0, erro: Some(e.to_string()) }
            }
            // los registros se perdieron con el hilo
            Err(e) => {
                warn!("falha ao persistir {}: {}", categoria, e);
                ResultadoPersistencia { categoria, tabela: categoria.tabela(), inseridos: 0, erro: Some(e.to_string()) }
            }
        };
        resultados.push(resultado);
    }

    let success = resultados.iter().all(|r| r.erro.is_none());
    HttpResponse::Ok().json(json!({"success": success, "resultados": resultados}))
}

/// GET /api/relatorios/fazendas?categoria=insumosFazendas
pub async fn relatorio_fazendas(query: web::Query<HashMap<String, String>>, almacen: Almacen) -> impl Responder {
    let categoria = match categoria_da_query(&query) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let registros = almacen.listar(categoria);
    HttpResponse::Ok().json(json!({
        "categoria": categoria,
        "fazendas": resumo_por_fazenda(&registros),
    }))
}

/// GET /api/mapeamentos
/// Tablas de mapeo y palabras clave de clasificación, para el front.
pub async fn listar_mapeamentos() -> impl Responder {
    let classificacao: Vec<_> = CLASIFICACION
        .iter()
        .map(|(chave, categoria)| json!({"palavraChave": chave, "categoria": categoria}))
        .collect();
    HttpResponse::Ok().json(json!({
        "mapeamentos": mapeamentos(),
        "classificacao": classificacao,
    }))
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({"status": "ok"}))
}
