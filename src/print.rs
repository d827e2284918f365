use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Col, Row, Table};

use crate::dataset::{Dataset, Value};

fn format_value(value: &Value) -> String {
    match value {
        Value::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
            format!("{number:.0}")
        }
        Value::Number(number) => format!("{number:.3}"),
        Value::Text(text) => text.clone(),
        Value::Missing => "-".to_string(),
    }
}

/// Renders a dataset with a leading row-number column. Numeric columns are right-aligned.
pub fn tabulate(data: &Dataset) -> Table {
    let mut table = Table::default()
        .with_cols({
            let mut cols = vec![Col::new(
                Styles::default()
                    .with(Separator(true))
                    .with(MinWidth(4))
                    .with(HAlign::Right),
            )];
            for column in data.columns() {
                let numeric = column
                    .values
                    .iter()
                    .all(|value| !matches!(value, Value::Text(_)));
                let align = if numeric { HAlign::Right } else { HAlign::Left };
                cols.push(Col::new(Styles::default().with(MinWidth(8)).with(align)));
            }
            cols
        })
        .with_row({
            let mut header_cells = vec!["".into()];
            for column in data.columns() {
                header_cells.push(column.name.clone().into());
            }
            Row::new(
                Styles::default().with(Header(true)).with(Separator(true)),
                header_cells,
            )
        });

    for row in 0..data.rows() {
        let mut row_cells = vec![format!("{row}").into()];
        for column in data.columns() {
            row_cells.push(format_value(&column.values[row]).into());
        }
        table.push_row(Row::new(Styles::default(), row_cells));
    }

    table
}
