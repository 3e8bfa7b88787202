use crate::support::{print_json_or_exit, registry_or_exit};
use serde_json::json;

pub fn run(scorer: String, json_output: bool) {
    let registry = registry_or_exit();
    let info = registry.describe(&scorer).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        print_json_or_exit(&json!(info));
    } else {
        println!("assay describe {}", info.id);
        println!("  Name: {}", info.name);
        println!(
            "  Applies to: {}",
            info.class.map_or("any estimator", |class| class.as_str())
        );
        if info.config.is_empty() {
            println!("  Config: (none)");
        } else {
            println!("  Config:");
            for field in info.config {
                println!(
                    "    - {} ({:?}, default {}): {}",
                    field.name, field.kind, field.default, field.help
                );
            }
        }
    }
}
