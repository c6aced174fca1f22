//! Standalone walkthrough: declare a hook, register a few plugins, dispatch
//! it under a couple of strategies, and exercise a scoped context.
//!
//! Run with `cargo run --example kernel_walkthrough` once this crate is
//! wired into a workspace that builds examples from `demos/`.

use std::sync::Arc;

use hookkern::{
    kernel, Args, HookSpec, Mode, NamedStrategy, PluginBuilder, ScopedSpec, Signature, Strategy,
};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let app = kernel("demo-app");

    app.register_spec(HookSpec::new(
        "on_greet",
        Signature::new(["name"]),
        Mode::Sync,
        Strategy::named(NamedStrategy::AllAvails),
    ))?;

    let formal = PluginBuilder::new("formal")
        .priority(0)
        .impl_sync("on_greet", Signature::new(["name"]), |args| {
            let name = args.positional.first().and_then(|v| v.as_str()).unwrap_or("there");
            Ok(json!(format!("Good day, {name}.")))
        })
        .build();

    let casual = PluginBuilder::new("casual")
        .priority(-1)
        .impl_sync("on_greet", Signature::new(["name"]), |args| {
            let name = args.positional.first().and_then(|v| v.as_str()).unwrap_or("there");
            Ok(json!(format!("hey {name}!")))
        })
        .build();

    app.register_plugins(vec![Arc::new(formal), Arc::new(casual)])?;

    let greetings = app.call_sync("on_greet", Args::new().with_positional([json!("Ada")]))?;
    println!("{greetings}");

    {
        let _scope = app.scoped(ScopedSpec::OnlyThese(vec!["formal".to_string()]))?;
        let formal_only = app.call_sync("on_greet", Args::new().with_positional([json!("Ada")]))?;
        println!("{formal_only}");
    }

    let restored = app.call_sync("on_greet", Args::new().with_positional([json!("Ada")]))?;
    println!("{restored}");

    Ok(())
}
