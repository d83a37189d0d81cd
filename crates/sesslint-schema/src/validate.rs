//! Per-record validation against a loaded ruleset.
//!
//! Pure over its inputs: a record is never mutated, and every violation
//! found is reported, not just the first. Unlisted fields never fail;
//! the rulesets leave `additionalProperties` permissive so newer-format
//! records stay checkable under an older contract.

use jsonschema::Validator;

use sesslint_core::{Outcome, Record, Violation, DISCRIMINATOR};

use crate::registry::{Ruleset, Shape};

impl Ruleset {
    /// Validate one decoded record against this ruleset.
    pub fn validate(&self, record: &Record) -> Outcome {
        match &self.shape {
            Shape::Uniform(validator) => collect(validator, record),
            Shape::Tagged(table) => {
                let Some(tag) = record.get(DISCRIMINATOR).and_then(|v| v.as_str()) else {
                    return Outcome::UnknownType(Violation {
                        path: format!("/{DISCRIMINATOR}"),
                        message: format!("missing message type discriminator '{DISCRIMINATOR}'"),
                        schema_path: String::new(),
                    });
                };
                match table.get(tag) {
                    Some(validator) => collect(validator, record),
                    None => Outcome::UnknownType(Violation {
                        path: format!("/{DISCRIMINATOR}"),
                        message: format!("unknown message type '{tag}'"),
                        schema_path: String::new(),
                    }),
                }
            }
        }
    }
}

fn collect(validator: &Validator, record: &Record) -> Outcome {
    let reasons: Vec<Violation> = validator
        .iter_errors(record)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
            schema_path: e.schema_path.to_string(),
        })
        .collect();

    if reasons.is_empty() {
        Outcome::Valid
    } else {
        Outcome::Invalid(reasons)
    }
}
