use miette::Result;
use nmeject_core::version::version_string;

pub fn run(json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "ok": true,
            "version": nmeject_core::VERSION,
            "display": version_string(),
        });
        println!("{}", serde_json::to_string_pretty(&value).unwrap());
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
