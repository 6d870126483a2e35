/// 事件发射器示例
/// 展示精确键与通配键的混合分发、有限次监听器、同步/延迟失败的汇总与错误观察者
use anyhow::Result as AnyResult;
use event_emitter::{EmitArg, EmitterConfig, EventEmitter, EventListener, Listener};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ============================================================================
// 面向对象风格的监听器
// ============================================================================

struct Mailer;

#[async_trait::async_trait]
impl EventListener for Mailer {
    fn listener_name(&self) -> &str {
        "mailer"
    }

    async fn handle(&self, args: Vec<Value>) -> AnyResult<()> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let email = args
            .get(1)
            .and_then(|p| p.get("email"))
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("payload has no email"))?;
        println!("[mailer] welcome mail queued for {email}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let emitter = EventEmitter::with_config(EmitterConfig::builder().max_listeners(4).build());

    emitter.on_error(|event, failure| {
        println!("[observer] {event}: {}", failure.error());
    });

    emitter.on(
        "user:created",
        Listener::sync(|args| {
            println!("[audit] user created: {}", args[0]);
            Ok(())
        }),
    );
    emitter.on("user:*", Listener::handler(Arc::new(Mailer)));
    emitter.once(
        "user:*",
        Listener::sync(|args| {
            println!("[once] first user event seen: {}", args[0]);
            Ok(())
        }),
    );

    let result = emitter
        .emit("user:created", [json!({"id": 1, "email": "a@example.com"})])
        .await;
    println!("user:created -> success={}", result.is_success());

    // 第二次发射：once 监听器已摘除，mailer 因缺少 email 失败
    let result = emitter
        .emit("user:deleted", [EmitArg::lazy(|| json!({"id": 1}))])
        .await;
    println!(
        "user:deleted -> success={}, errors={}",
        result.is_success(),
        result.errors().len()
    );

    emitter.clear(None);
    let result = emitter.emit_empty("user:created");
    println!("after clear -> immediate={}", result.is_immediate());

    Ok(())
}
