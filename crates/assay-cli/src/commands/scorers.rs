use crate::support::{parse_class_or_exit, print_json_or_exit, registry_or_exit};
use assay_kernel::registry::{REGISTRY_KIND, REGISTRY_SCHEMA};
use assay_kernel::{Scorer, ScorerInfo};
use serde_json::json;

pub fn run(class: Option<String>, json_output: bool) {
    let registry = registry_or_exit();
    let class = class.as_deref().map(parse_class_or_exit);
    let scorers: Vec<ScorerInfo> = match class {
        Some(class) => registry.scorers_for(class).map(Scorer::info).collect(),
        None => registry.scorers().map(Scorer::info).collect(),
    };

    if json_output {
        let payload = json!({
            "schema": REGISTRY_SCHEMA,
            "registryKind": REGISTRY_KIND,
            "class": class,
            "count": scorers.len(),
            "scorers": scorers,
        });
        print_json_or_exit(&payload);
    } else {
        match class {
            Some(class) => println!("assay scorers --class {class}"),
            None => println!("assay scorers"),
        }
        println!("  Count: {}", scorers.len());
        for info in &scorers {
            let class = info.class.map_or("any", |class| class.as_str());
            println!("  - {} [{class}] {}", info.id, info.name);
        }
    }
}
