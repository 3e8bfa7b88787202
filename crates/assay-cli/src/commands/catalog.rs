use crate::support::print_json_or_exit;
use assay_kernel::catalog::{self, CATALOG};
use assay_kernel::{MetricClass, catalog_json};

const CLASSES: [MetricClass; 3] = [
    MetricClass::Classification,
    MetricClass::Clustering,
    MetricClass::Regression,
];

pub fn run(json_output: bool) {
    if json_output {
        print_json_or_exit(&catalog_json());
        return;
    }

    println!("assay catalog");
    println!("  Metrics: {}", CATALOG.len());
    for class in CLASSES {
        println!("  {class}:");
        for descriptor in catalog::entries(class) {
            let fields: Vec<&str> = descriptor.config.iter().map(|field| field.name).collect();
            if fields.is_empty() {
                println!("    - {}", descriptor.id);
            } else {
                println!("    - {} ({})", descriptor.id, fields.join(", "));
            }
        }
    }
}
