use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{info, warn};

use crate::almacen::{AlmacenMemoria, RepositorioImportacao};
use crate::config::Config;
use crate::persistencia::DestinoPostgres;
use crate::server_handlers::{
    health, importar_handler, limpar_registros, listar_mapeamentos, listar_registros, persistir_registros,
    relatorio_fazendas,
};

/// Rutas del servicio. Se usa tanto en `run_server` como en los tests.
pub fn configurar_rutas(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/api")
            .route("/importar", web::post().to(importar_handler))
            .route("/registros", web::get().to(listar_registros))
            .route("/registros", web::delete().to(limpar_registros))
            .route("/registros/persistir", web::post().to(persistir_registros))
            .route("/relatorios/fazendas", web::get().to(relatorio_fazendas))
            .route("/mapeamentos", web::get().to(listar_mapeamentos)),
    );
}

/// Levanta el servidor HTTP con un almacén en memoria nuevo.
pub async fn run_server(config: Config) -> std::io::Result<()> {
    if let Some(url) = config.database_url.as_deref() {
        // las tablas se crean una vez; sin base el servicio igual importa
        let destino = DestinoPostgres::new(url);
        match web::block(move || destino.inicializar()).await {
            Ok(Ok(())) => info!("tabelas de destino verificadas"),
            Ok(Err(e)) => warn!("não foi possível preparar as tabelas: {}", e),
            Err(e) => warn!("não foi possível preparar as tabelas: {}", e),
        }
    } else {
        warn!("DATABASE_URL não definida: persistência desativada");
    }

    let almacen: Arc<dyn RepositorioImportacao> = Arc::new(AlmacenMemoria::new());
    let almacen = web::Data::new(almacen);
    let bind = config.bind.clone();
    let config = web::Data::new(config);

    info!("servidor em http://{}", bind);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .app_data(almacen.clone())
            .app_data(config.clone())
            .configure(configurar_rutas)
    })
    .bind(bind)?
    .run()
    .await
}
