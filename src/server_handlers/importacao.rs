use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use futures_util::stream::StreamExt;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::almacen::RepositorioImportacao;
use crate::config::Config;
use crate::error::ErroImportacao;
use crate::excel::importar_upload;

/// Extensiones que acepta el upload.
pub const EXTENSOES_ACEITAS: [&str; 6] = ["xlsx", "xlsm", "xls", "xlsb", "ods", "csv"];

/// Archivo temporal del upload; se borra al salir del handler, también
/// cuando la lectura del libro falla.
struct ArquivoTemporario {
    path: PathBuf,
}

impl ArquivoTemporario {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArquivoTemporario {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("arquivo temporário {:?} removido", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("não foi possível remover {:?}: {}", self.path, e),
        }
    }
}

fn extensao_aceita(nome: &str) -> Option<String> {
    let ext = Path::new(nome).extension()?.to_str()?.to_lowercase();
    EXTENSOES_ACEITAS.contains(&ext.as_str()).then_some(ext)
}

/// POST /api/importar (multipart, campo `file`)
///
/// Guarda el upload en un temporal, lo importa en el pool bloqueante y
/// agrega los registros al almacén. El cuerpo de la respuesta es el resumen
/// de importación.
pub async fn importar_handler(
    mut payload: Multipart,
    almacen: web::Data<Arc<dyn RepositorioImportacao>>,
    config: web::Data<Config>,
) -> impl Responder {
    if let Err(e) = tokio::fs::create_dir_all(&config.upload_dir).await {
        return HttpResponse::InternalServerError().json(json!({"error": format!("falha ao criar diretório de upload: {}", e)}));
    }

    let mut recebido: Option<(String, ArquivoTemporario)> = None;

    while let Some(field_res) = payload.next().await {
        let mut field = match field_res {
            Ok(f) => f,
            Err(e) => return HttpResponse::BadRequest().json(json!({"error": format!("multipart inválido: {}", e)})),
        };

        let disposition = field.content_disposition();
        if disposition.get_name() != Some("file") {
            // drenar campos que no nos interesan
            while let Some(_chunk) = field.next().await {}
            continue;
        }
        let nome = disposition.get_filename().map(|s| s.to_string()).unwrap_or_default();

        let Some(ext) = extensao_aceita(&nome) else {
            let erro = ErroImportacao::FormatoNoSoportado(nome);
            return HttpResponse::BadRequest().json(json!({"success": false, "error": erro.to_string()}));
        };

        let temporario = ArquivoTemporario { path: config.upload_dir.join(format!("{}.{}", uuid::Uuid::new_v4(), ext)) };
        let mut f = match tokio::fs::File::create(temporario.path()).await {
            Ok(f) => f,
            Err(e) => {
                return HttpResponse::InternalServerError().json(json!({"error": format!("falha ao criar arquivo temporário: {}", e)}))
            }
        };

        let mut tamanho = 0usize;
        while let Some(chunk) = field.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => return HttpResponse::BadRequest().json(json!({"error": format!("falha no upload: {}", e)})),
            };
            tamanho += bytes.len();
            if tamanho > config.max_upload_bytes {
                let erro = ErroImportacao::ArchivoMuyGrande { limite: config.max_upload_bytes };
                return HttpResponse::PayloadTooLarge().json(json!({"success": false, "error": erro.to_string()}));
            }
            if let Err(e) = f.write_all(&bytes).await {
                return HttpResponse::InternalServerError().json(json!({"error": format!("falha ao gravar upload: {}", e)}));
            }
        }
        if let Err(e) = f.flush().await {
            return HttpResponse::InternalServerError().json(json!({"error": format!("falha ao gravar upload: {}", e)}));
        }

        info!("upload '{}' recebido ({} bytes)", nome, tamanho);
        recebido = Some((nome, temporario));
        break;
    }

    let Some((nome, temporario)) = recebido else {
        return HttpResponse::BadRequest().json(json!({"success": false, "error": "campo 'file' ausente"}));
    };

    let path = temporario.path().to_path_buf();
    let opcoes = config.opcoes_importacao();
    let nome_upload = nome.clone();
    let resultado = match web::block(move || importar_upload(&path, &nome_upload, &opcoes)).await {
        Ok(r) => r,
        Err(e) => return HttpResponse::InternalServerError().json(json!({"error": format!("falha ao importar: {}", e)})),
    };
    drop(temporario);

    if !resultado.resumo.success {
        return HttpResponse::UnprocessableEntity().json(resultado.resumo);
    }

    for (categoria, registros) in resultado.registros {
        almacen.guardar(categoria, registros);
    }
    info!("'{}': {}", nome, resultado.resumo.message);
    HttpResponse::Ok().json(resultado.resumo)
}
