//! Rule-based templates for `template` mode (§4.8): deterministic,
//! network-free stand-ins for the live model, keyed on domain so demos and
//! offline tests have something concrete to parse.

use crate::error::{LlmError, Result};
use crate::CompletionKind;

/// Canned output for domains with a known template. Demographics is the
/// one domain every SDTM study carries, so it is the only one templated
/// out of the box; callers needing other domains run in `log-only` or
/// `live` mode instead.
pub fn render(kind: CompletionKind, domain: &str) -> Result<String> {
    if domain.to_uppercase() != "DM" {
        return Err(LlmError::NoTemplate {
            domain: domain.to_string(),
        });
    }
    Ok(match kind {
        CompletionKind::SpecDraft => DM_TEMPLATE.to_string(),
        CompletionKind::SpecReview => DM_REVIEW_TEMPLATE.to_string(),
        CompletionKind::ProductionScript => DM_PRODUCTION_SCRIPT.to_string(),
        CompletionKind::QcScript => DM_QC_SCRIPT.to_string(),
    })
}

const DM_TEMPLATE: &str = r#"{
  "variables": [
    {
      "target_variable": "USUBJID",
      "target_domain": "DM",
      "source_variable": "SUBJID",
      "source_dataset": "dm",
      "data_type": "char",
      "length": 20,
      "codelist_code": null,
      "codelist_name": null,
      "controlled_terms": [],
      "mapping_logic": "concatenate STUDYID and SUBJID",
      "macro_used": null,
      "function_parameters": {},
      "assumptions": [],
      "human_decision_required": false,
      "decision_options": []
    },
    {
      "target_variable": "AGE",
      "target_domain": "DM",
      "source_variable": "AGE",
      "source_dataset": "dm",
      "data_type": "num",
      "length": 3,
      "codelist_code": null,
      "codelist_name": null,
      "controlled_terms": [],
      "mapping_logic": "copy",
      "macro_used": null,
      "function_parameters": {},
      "assumptions": [],
      "human_decision_required": false,
      "decision_options": []
    },
    {
      "target_variable": "SEX",
      "target_domain": "DM",
      "source_variable": "SEX",
      "source_dataset": "dm",
      "data_type": "char",
      "length": 1,
      "codelist_code": "C66731",
      "codelist_name": "Sex",
      "controlled_terms": ["M", "F", "U"],
      "mapping_logic": "map to SDTM sex codelist",
      "macro_used": null,
      "function_parameters": {},
      "assumptions": [],
      "human_decision_required": false,
      "decision_options": []
    }
  ]
}"#;

const DM_REVIEW_TEMPLATE: &str = r#"{"findings": []}"#;

const DM_PRODUCTION_SCRIPT: &str = r#"# production script for DM
# generated from the approved mapping spec; do not hand-edit.
import pandas as pd

def run(raw_data_root, output_path):
    dm = pd.read_csv(f"{raw_data_root}/DM.csv")
    out = pd.DataFrame()
    out["STUDYID"] = dm["STUDYID"]
    out["USUBJID"] = dm["STUDYID"].astype(str) + "-" + dm["SUBJID"].astype(str)
    out["AGE"] = dm["AGE"]
    out["SEX"] = dm["SEX"].str.upper().map({"M": "M", "F": "F"}).fillna("U")
    out.to_parquet(output_path, index=False)

if __name__ == "__main__":
    import sys
    run(sys.argv[1], sys.argv[2])
"#;

const DM_QC_SCRIPT: &str = r#"# independent qc script for DM
# written without reference to the production implementation.
import pandas as pd

def build_dm(raw_data_root):
    source = pd.read_csv(f"{raw_data_root}/DM.csv")
    result = pd.DataFrame({
        "STUDYID": source["STUDYID"],
        "USUBJID": source["STUDYID"].astype(str) + "-" + source["SUBJID"].astype(str),
        "AGE": source["AGE"],
        "SEX": source["SEX"].str.upper().apply(lambda v: v if v in ("M", "F") else "U"),
    })
    return result

if __name__ == "__main__":
    import sys
    build_dm(sys.argv[1]).to_parquet(sys.argv[2], index=False)
"#;
