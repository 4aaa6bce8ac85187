//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::str::FromStr;
use std::sync::Once;

static INIT: Once = Once::new();

/// Load .env if present, exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        Err(_) => default,
    }
}

/// Database DSN: explicit `DATABASE_URL`/`DB_URL` first, otherwise composed
/// from discrete `POSTGRES_*` variables.
pub fn db_url() -> anyhow::Result<String> {
    init_env();
    for k in ["DATABASE_URL", "DB_URL"] {
        if let Some(v) = env_opt(k) {
            return Ok(v);
        }
    }
    if let Some(dsn) = build_dsn_from_parts() {
        return Ok(dsn);
    }
    Err(anyhow::anyhow!(
        "no database URL configured; set DATABASE_URL or the POSTGRES_* variables"
    ))
}

fn build_dsn_from_parts() -> Option<String> {
    let host = env_opt("POSTGRES_HOST")?;
    let user = env_opt("POSTGRES_USER")?;
    let password = env_opt("POSTGRES_PASSWORD");
    let database = env_opt("POSTGRES_DB").unwrap_or_else(|| "postgres".into());
    let port: u16 = env_opt("POSTGRES_PORT")
        .and_then(|p| p.parse().ok())
        .unwrap_or(5432);

    // Credentials may contain reserved URL characters; build via `url::Url`
    // so username/password are percent-encoded safely.
    let mut out = url::Url::parse("postgresql://localhost").ok()?;
    out.set_username(&user).ok()?;
    if let Some(pass) = password {
        out.set_password(Some(&pass)).ok()?;
    }
    out.set_host(Some(host.trim())).ok()?;
    out.set_port(Some(port)).ok()?;
    out.set_path(&format!("/{database}"));
    Some(out.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsn_from_parts_encodes_credentials() {
        std::env::set_var("POSTGRES_HOST", "db.internal");
        std::env::set_var("POSTGRES_USER", "loader");
        std::env::set_var("POSTGRES_PASSWORD", "p@ss?word");
        std::env::set_var("POSTGRES_DB", "football");
        std::env::set_var("POSTGRES_PORT", "5433");

        let dsn = build_dsn_from_parts().expect("dsn");
        assert!(dsn.starts_with("postgresql://loader:"));
        assert!(dsn.contains("db.internal:5433/football"));
        assert!(!dsn.contains("p@ss?word"), "password must be encoded");

        for k in [
            "POSTGRES_HOST",
            "POSTGRES_USER",
            "POSTGRES_PASSWORD",
            "POSTGRES_DB",
            "POSTGRES_PORT",
        ] {
            std::env::remove_var(k);
        }
    }
}
