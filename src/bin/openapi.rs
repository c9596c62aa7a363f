use anyhow::{bail, Result};
use foilctf::api::{auth_openapi, web_openapi};

// Usage: openapi [web|auth]
fn main() -> Result<()> {
    let doc = match std::env::args().nth(1).as_deref() {
        None | Some("web") => web_openapi(),
        Some("auth") => auth_openapi(),
        Some(other) => bail!("unknown document: {other}, expected web or auth"),
    };
    let json = serde_json::to_string_pretty(&doc)?;
    println!("{json}");
    Ok(())
}
