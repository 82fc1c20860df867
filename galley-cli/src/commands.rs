use anyhow::{Context, Result};
use galley::{
    registry::REGISTRY_FILE,
    source::{read_source, rooted},
    ClientBuilder, ImportResolver, Registry, Value,
};
use std::path::Path;

async fn load_registry(builder: &ClientBuilder) -> Result<Registry> {
    let path = builder.root().join(REGISTRY_FILE);
    Registry::load(&path)
        .await
        .with_context(|| format!("Could not load {path:?}"))
}

fn parse_args(args: Option<&str>) -> Result<Vec<Value>> {
    match args {
        Some(json) => serde_json::from_str(json).context("--args must be a JSON array of values"),
        None => Ok(Vec::new()),
    }
}

pub async fn accounts_impl(builder: ClientBuilder) -> Result<()> {
    let registry = load_registry(&builder).await?;
    let accounts = registry.accounts_sorted(builder.network())?;
    println!("Accounts on {}:", builder.network());
    for (name, account) in accounts {
        let signer = if account.is_qualified() { "" } else { " (no key)" };
        println!("  {name:<16} {}{signer}", account.address());
    }
    Ok(())
}

pub async fn resolve_impl(builder: ClientBuilder, file: &Path) -> Result<()> {
    let registry = load_registry(&builder).await?;
    let resolver = ImportResolver::from_registry(&registry, builder.network())?;
    let text = read_source(&rooted(builder.root(), file)).await?;
    let resolved = resolver.resolve_source(&text);
    for (name, address) in &resolved.resolved_imports {
        tracing::info!(contract = %name, %address, "Resolved import");
    }
    println!("{}", String::from_utf8_lossy(&resolved.bytes));
    Ok(())
}

pub async fn up_impl(builder: ClientBuilder) -> Result<()> {
    let session = builder.start().await?;
    println!(
        "Session ready on {} ({})",
        session.network(),
        if session.is_embedded() {
            "embedded"
        } else {
            "remote"
        }
    );
    for name in session.account_names()? {
        let account = session.account(&name)?;
        let contracts = session
            .registry()
            .deployments_for_account(session.network(), &name)?;
        println!("  {name:<16} {}  {}", account.address(), contracts.join(", "));
    }
    Ok(())
}

pub async fn send_impl(
    builder: ClientBuilder,
    file: &Path,
    signer: &str,
    payer: Option<&str>,
    args: Option<&str>,
) -> Result<()> {
    let arguments = parse_args(args)?;
    let session = builder.start().await?;
    let mut tx = session
        .actor(signer)?
        .new_transaction_from_file(file)
        .await?
        .arguments(arguments);
    if let Some(payer) = payer {
        tx = tx.payer(session.account(payer)?);
    }
    let result = tx.sign_and_send().await?;
    for event in &result.events {
        println!("event {} {:?}", event.name, event.fields);
    }
    let result = result.into_sealed()?;
    println!("Transaction {} sealed", result.id);
    Ok(())
}

pub async fn query_impl(builder: ClientBuilder, file: &Path, args: Option<&str>) -> Result<()> {
    let arguments = parse_args(args)?;
    let session = builder.start().await?;
    let value = session
        .new_query_from_file(file)
        .await?
        .arguments(arguments)
        .execute()
        .await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
