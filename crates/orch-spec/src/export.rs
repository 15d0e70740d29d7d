//! Human-readable spec export: one row per variable, rendered as a
//! terminal/markdown-friendly table (teacher's `sdtm_cli::summary` table
//! styling, §4.3 `export_human_readable`).

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use orch_model::SpecDocument;

pub fn export_human_readable(spec: &SpecDocument) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Target",
        "Source",
        "Type",
        "Length",
        "Codelist",
        "Macro",
        "Mapping logic",
        "Human decision",
    ]);

    for variable in &spec.variables {
        let source = variable
            .source_variable
            .as_deref()
            .map(|v| match &variable.source_dataset {
                Some(ds) => format!("{ds}.{v}"),
                None => v.to_string(),
            })
            .unwrap_or_else(|| "—".to_string());
        let codelist = variable.codelist_code.as_deref().unwrap_or("—").to_string();
        let macro_used = variable.macro_used.as_deref().unwrap_or("—").to_string();
        let length_cell = Cell::new(variable.length).set_alignment(CellAlignment::Right);

        table.add_row(vec![
            Cell::new(&variable.target_variable),
            Cell::new(source),
            Cell::new(format!("{:?}", variable.data_type)),
            length_cell,
            Cell::new(codelist),
            Cell::new(macro_used),
            Cell::new(&variable.mapping_logic),
            Cell::new(if variable.human_decision_required { "yes" } else { "" }),
        ]);
    }

    format!(
        "Spec for {} / {} (version {})\n\n{table}",
        spec.study_id, spec.domain, spec.spec_version
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use orch_model::{DataType, VariableMapping};

    #[test]
    fn renders_one_row_per_variable() {
        let spec = SpecDocument {
            study_id: "STUDY1".into(),
            domain: "DM".into(),
            spec_version: "0.1".into(),
            created_by: "spec-builder".into(),
            created_at: chrono::Utc::now(),
            variables: vec![VariableMapping {
                target_variable: "AGE".into(),
                target_domain: "DM".into(),
                source_variable: Some("AGE_RAW".into()),
                source_dataset: Some("dm".into()),
                data_type: DataType::Num,
                length: 3,
                codelist_code: None,
                codelist_name: None,
                controlled_terms: Vec::new(),
                mapping_logic: "copy".into(),
                macro_used: None,
                function_parameters: Default::default(),
                assumptions: Vec::new(),
                human_decision_required: false,
                decision_options: Vec::new(),
            }],
        };
        let rendered = export_human_readable(&spec);
        assert!(rendered.contains("AGE"));
        assert!(rendered.contains("dm.AGE_RAW"));
    }
}
