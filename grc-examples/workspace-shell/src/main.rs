use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = workspace_shell::config::from_env();
    let shell = workspace_shell::build(&cfg)?;

    let addr = shell.state.settings.addr();
    println!("[workspace-shell] listening on http://{addr}");

    shell.listen(addr).await?;

    Ok(())
}
