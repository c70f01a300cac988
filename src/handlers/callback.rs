/// Platform callback endpoints
use actix_web::{web, HttpResponse};
use rand::{distr::Alphanumeric, Rng};

use crate::config::AppConfig;
use crate::models::{
    render_sealed, BodyFormat, CallbackQuery, EncryptedEnvelope, IncomingMessage, MessageKind,
    ReplyMessage,
};
use crate::security::{CallbackCodec, CallbackError};
use crate::services::{MessageDispatcher, SchedulerHandle, WeComClient};

fn missing_parameters() -> HttpResponse {
    log::warn!("Callback rejected: missing parameters");
    HttpResponse::BadRequest()
        .content_type("text/plain; charset=utf-8")
        .body("missing callback parameters")
}

/// Log a rejection without leaking which decryption step failed
fn rejected(err: CallbackError) -> CallbackError {
    if err.is_decryption_failure() {
        log::warn!("Callback rejected: decryption failed");
    } else {
        log::warn!("Callback rejected: {}", err);
    }
    log::debug!("Callback rejection detail: {:?}", err);
    err
}

fn reply_nonce() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Verify the signature over the echo string and return it decrypted
pub(crate) fn answer_echo(codec: &CallbackCodec, query: &CallbackQuery) -> Result<HttpResponse, CallbackError> {
    let echostr = match query.echostr.as_deref() {
        Some(e) if query.is_url_verification() => e,
        _ => return Ok(missing_parameters()),
    };

    let plaintext = codec
        .open(&query.msg_signature, &query.timestamp, &query.nonce, echostr)
        .map_err(rejected)?;

    log::info!("✅ Callback URL verified");
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(plaintext))
}

/// URL verification
/// GET /webhook
pub async fn verify_url(
    codec: web::Data<CallbackCodec>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, CallbackError> {
    answer_echo(&codec, &query)
}

/// Message delivery
/// POST /webhook
pub async fn receive_message(
    codec: web::Data<CallbackCodec>,
    dispatcher: web::Data<MessageDispatcher>,
    client: web::Data<WeComClient>,
    config: web::Data<AppConfig>,
    query: web::Query<CallbackQuery>,
    body: String,
) -> Result<HttpResponse, CallbackError> {
    if !query.has_signature_fields() {
        return Ok(missing_parameters());
    }

    let (envelope, format) = EncryptedEnvelope::parse(&body).map_err(rejected)?;
    let plaintext = codec
        .open(&query.msg_signature, &query.timestamp, &query.nonce, &envelope.encrypt)
        .map_err(rejected)?;
    let message = IncomingMessage::parse(&plaintext, format).map_err(rejected)?;

    match message.kind() {
        MessageKind::Text(content) => {
            log::info!("Text message from {}", message.from_user_name);
            match dispatcher.dispatch(content, &message.from_user_name) {
                Some(reply) => seal_reply(&codec, &message, reply, format),
                None => Ok(HttpResponse::Ok().finish()),
            }
        }
        MessageKind::Event(event) => {
            log::info!("Event '{}' from {}", event, message.from_user_name);
            if event == "subscribe" && !message.from_user_name.is_empty() {
                let client = client.into_inner();
                let user_id = message.from_user_name.clone();
                let welcome = config.welcome_message.clone();
                actix_web::rt::spawn(async move {
                    if let Err(e) = client.send_text_to(&welcome, Some(vec![user_id])).await {
                        log::error!("Failed to send welcome message: {}", e);
                    }
                });
            }
            Ok(HttpResponse::Ok().finish())
        }
        MessageKind::Other(msg_type) => {
            log::info!("Ignoring message of type '{}'", msg_type);
            Ok(HttpResponse::Ok().finish())
        }
    }
}

fn seal_reply(
    codec: &CallbackCodec,
    incoming: &IncomingMessage,
    reply: String,
    format: BodyFormat,
) -> Result<HttpResponse, CallbackError> {
    let now = chrono::Utc::now().timestamp();
    let document = format.render(&ReplyMessage::text(incoming, reply, now))?;
    let sealed = codec.seal(&document, &now.to_string(), &reply_nonce())?;

    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .body(render_sealed(&sealed, format)?))
}

/// Root path: URL verification when the platform hits it, status otherwise
/// GET /
pub async fn index(
    codec: web::Data<CallbackCodec>,
    dispatcher: web::Data<MessageDispatcher>,
    scheduler: web::Data<SchedulerHandle>,
    config: web::Data<AppConfig>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse, CallbackError> {
    if query.is_url_verification() {
        log::info!("Callback verification received on root path");
        return answer_echo(&codec, &query);
    }
    Ok(super::bot::status_response(&dispatcher, &scheduler, &config))
}
