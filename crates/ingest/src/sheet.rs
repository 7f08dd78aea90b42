//! Spreadsheet seed reader.
//!
//! A workbook must contain `Variables`, `Triggers`, and `Tags` sheets. The
//! first row of each sheet is a header row; recognized columns are matched by
//! lowercase name. Each data row contributes at most one parameter/filter, and
//! rows sharing a resource `name` merge into a single descriptor, so wide
//! resources are authored as consecutive rows.
//!
//! Rows whose `name` cell is blank are skipped; that is the one documented
//! coercion. Anything else that cannot be interpreted (error cells, missing
//! columns, conflicting types, unpairable filter syntax) fails the whole
//! parse with the sheet and row number.

use std::collections::HashMap;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use tagforge_types::{ContainerSeed, Parameter, TagSpec, TriggerFilter, TriggerSpec, VariableSpec};

use crate::ParseError;

const VARIABLES_SHEET: &str = "Variables";
const TRIGGERS_SHEET: &str = "Triggers";
const TAGS_SHEET: &str = "Tags";

const DEFAULT_VARIABLE_TYPE: &str = "v";
const DEFAULT_TRIGGER_TYPE: &str = "PAGEVIEW";
const DEFAULT_TAG_TYPE: &str = "html";

static EMPTY_CELL: Data = Data::Empty;

pub(crate) fn parse_workbook(path: &Path) -> Result<ContainerSeed, ParseError> {
    let display_path = path.display().to_string();
    let mut workbook = open_workbook_auto(path).map_err(|source| ParseError::UnreadableWorkbook {
        path: display_path.clone(),
        source,
    })?;

    for sheet in [VARIABLES_SHEET, TRIGGERS_SHEET, TAGS_SHEET] {
        if !workbook.sheet_names().iter().any(|name| name == sheet) {
            return Err(ParseError::MissingSheet {
                path: display_path,
                sheet: sheet.to_string(),
            });
        }
    }

    let mut sheet_range = |sheet: &str| {
        workbook
            .worksheet_range(sheet)
            .map_err(|source| ParseError::UnreadableWorkbook {
                path: display_path.clone(),
                source,
            })
    };
    let variables_range = sheet_range(VARIABLES_SHEET)?;
    let triggers_range = sheet_range(TRIGGERS_SHEET)?;
    let tags_range = sheet_range(TAGS_SHEET)?;

    Ok(ContainerSeed {
        variables: parse_variables(&display_path, &variables_range)?,
        triggers: parse_triggers(&display_path, &triggers_range)?,
        tags: parse_tags(&display_path, &tags_range)?,
    })
}

fn parse_variables(path: &str, range: &Range<Data>) -> Result<Vec<VariableSpec>, ParseError> {
    let Some(sheet) = SheetRows::new(path, VARIABLES_SHEET, range)? else {
        return Ok(Vec::new());
    };

    let mut variables: Vec<VariableSpec> = Vec::new();
    for row in sheet.data_rows() {
        let Some(name) = row.text("name")? else { continue };

        let mut parameter = Vec::new();
        if let Some(value) = row.text("value")? {
            parameter.push(template_parameter("value", &value));
        }
        parameter.extend(row.keyed_parameters()?);

        let row_type = row.text("type")?;
        match variables.iter_mut().find(|v| v.name == name) {
            Some(existing) => {
                row.check_type_conflict("variable", &name, &existing.r#type, row_type.as_deref())?;
                existing.parameter.extend(parameter);
            }
            None => variables.push(VariableSpec {
                name,
                r#type: row_type.unwrap_or_else(|| DEFAULT_VARIABLE_TYPE.to_string()),
                parameter,
            }),
        }
    }
    Ok(variables)
}

fn parse_triggers(path: &str, range: &Range<Data>) -> Result<Vec<TriggerSpec>, ParseError> {
    let Some(sheet) = SheetRows::new(path, TRIGGERS_SHEET, range)? else {
        return Ok(Vec::new());
    };

    let mut triggers: Vec<TriggerSpec> = Vec::new();
    for row in sheet.data_rows() {
        let Some(name) = row.text("name")? else { continue };
        let row_type = row.text("type")?;
        let effective_type = row_type.clone().unwrap_or_else(|| DEFAULT_TRIGGER_TYPE.to_string());

        let mut custom_event_filter = Vec::new();
        if let Some(event_name) = row.text("event_name")? {
            if effective_type != "CUSTOM_EVENT" {
                return Err(row.malformed(format!(
                    "event_name '{event_name}' is only valid on CUSTOM_EVENT triggers, found type '{effective_type}'"
                )));
            }
            custom_event_filter.push(TriggerFilter {
                r#type: "equals".to_string(),
                parameter: vec![
                    template_parameter("arg0", "{{_event}}"),
                    template_parameter("arg1", &event_name),
                ],
            });
        }

        let mut filter = Vec::new();
        let filter_type = row.text("filter_type")?;
        let filter_parameter = row.text("filter_parameter")?;
        match (filter_type, filter_parameter) {
            (Some(filter_type), filter_parameter) => {
                filter.push(TriggerFilter {
                    r#type: filter_type,
                    parameter: row.filter_parameters(filter_parameter.as_deref())?,
                });
            }
            (None, Some(_)) => {
                return Err(row.malformed("filter_parameter requires a filter_type in the same row".to_string()));
            }
            (None, None) => {}
        }

        match triggers.iter_mut().find(|t| t.name == name) {
            Some(existing) => {
                row.check_type_conflict("trigger", &name, &existing.r#type, row_type.as_deref())?;
                existing.filter.extend(filter);
                existing.custom_event_filter.extend(custom_event_filter);
            }
            None => triggers.push(TriggerSpec {
                name,
                r#type: effective_type,
                filter,
                custom_event_filter,
                auto_event_filter: Vec::new(),
            }),
        }
    }
    Ok(triggers)
}

fn parse_tags(path: &str, range: &Range<Data>) -> Result<Vec<TagSpec>, ParseError> {
    let Some(sheet) = SheetRows::new(path, TAGS_SHEET, range)? else {
        return Ok(Vec::new());
    };

    let mut tags: Vec<TagSpec> = Vec::new();
    for row in sheet.data_rows() {
        let Some(name) = row.text("name")? else { continue };
        let row_type = row.text("type")?;
        let effective_type = row_type.clone().unwrap_or_else(|| DEFAULT_TAG_TYPE.to_string());

        let mut parameter = Vec::new();
        if let Some(html) = row.text("html")? {
            if effective_type != "html" {
                return Err(row.malformed(format!(
                    "html content is only valid on html tags, found type '{effective_type}'"
                )));
            }
            parameter.push(template_parameter("html", &html));
        }
        parameter.extend(row.keyed_parameters()?);

        let firing = row.text("firing_triggers")?.map(|s| split_list(&s)).unwrap_or_default();
        let blocking = row.text("blocking_triggers")?.map(|s| split_list(&s)).unwrap_or_default();

        match tags.iter_mut().find(|t| t.name == name) {
            Some(existing) => {
                row.check_type_conflict("tag", &name, &existing.r#type, row_type.as_deref())?;
                existing.parameter.extend(parameter);
                existing.firing_trigger_names.extend(firing);
                existing.blocking_trigger_names.extend(blocking);
            }
            None => tags.push(TagSpec {
                name,
                r#type: effective_type,
                parameter,
                firing_trigger_names: firing,
                blocking_trigger_names: blocking,
            }),
        }
    }
    Ok(tags)
}

/// Header-indexed view over one sheet's rows.
struct SheetRows<'a> {
    path: &'a str,
    sheet: &'a str,
    columns: HashMap<String, usize>,
    rows: Vec<&'a [Data]>,
}

impl<'a> SheetRows<'a> {
    /// Returns `None` for a sheet with no rows at all.
    fn new(path: &'a str, sheet: &'a str, range: &'a Range<Data>) -> Result<Option<Self>, ParseError> {
        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(None);
        };

        let mut columns = HashMap::new();
        for (index, cell) in header_row.iter().enumerate() {
            if let Data::String(header) = cell {
                columns.insert(header.trim().to_lowercase(), index);
            }
        }
        if !columns.contains_key("name") {
            return Err(ParseError::MalformedRow {
                path: path.to_string(),
                sheet: sheet.to_string(),
                row: 1,
                problem: "missing required column 'name'".to_string(),
            });
        }

        Ok(Some(Self {
            path,
            sheet,
            columns,
            rows: rows.collect(),
        }))
    }

    fn data_rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().enumerate().map(|(offset, cells)| RowView {
            sheet: self,
            cells,
            // header is row 1, data starts at row 2
            row_number: offset + 2,
        })
    }
}

/// One data row plus enough context to build precise errors.
struct RowView<'a> {
    sheet: &'a SheetRows<'a>,
    cells: &'a [Data],
    row_number: usize,
}

impl RowView<'_> {
    fn malformed(&self, problem: String) -> ParseError {
        ParseError::MalformedRow {
            path: self.sheet.path.to_string(),
            sheet: self.sheet.sheet.to_string(),
            row: self.row_number,
            problem,
        }
    }

    /// Trimmed text content of a column, `None` when absent or blank.
    fn text(&self, column: &str) -> Result<Option<String>, ParseError> {
        let cell = self
            .sheet
            .columns
            .get(column)
            .and_then(|index| self.cells.get(*index))
            .unwrap_or(&EMPTY_CELL);

        match cell {
            Data::Empty => Ok(None),
            Data::String(text) => {
                let trimmed = text.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Data::Int(value) => Ok(Some(value.to_string())),
            Data::Float(value) if value.fract() == 0.0 => Ok(Some(format!("{}", *value as i64))),
            Data::Float(value) => Ok(Some(value.to_string())),
            Data::Bool(value) => Ok(Some(value.to_string())),
            Data::Error(cell_error) => Err(self.malformed(format!(
                "column '{column}' contains a spreadsheet error value ({cell_error:?})"
            ))),
            other => Ok(Some(other.to_string())),
        }
    }

    /// `parameter_key`/`parameter_value` columns: pipe-separated, positionally
    /// paired, missing values default to the empty string.
    fn keyed_parameters(&self) -> Result<Vec<Parameter>, ParseError> {
        let Some(keys) = self.text("parameter_key")? else {
            return Ok(Vec::new());
        };
        let values_text = self.text("parameter_value")?.unwrap_or_default();
        let values: Vec<&str> = values_text.split('|').map(str::trim).collect();

        keys.split('|')
            .map(str::trim)
            .enumerate()
            .map(|(index, key)| {
                if key.is_empty() {
                    return Err(self.malformed("parameter_key contains an empty entry".to_string()));
                }
                Ok(template_parameter(key, values.get(index).copied().unwrap_or_default()))
            })
            .collect()
    }

    /// `filter_parameter` syntax: `key:value|key:value`.
    fn filter_parameters(&self, raw: Option<&str>) -> Result<Vec<Parameter>, ParseError> {
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        raw.split('|')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once(':') {
                Some((key, value)) => Ok(template_parameter(key.trim(), value.trim())),
                None => Err(self.malformed(format!(
                    "filter_parameter entry '{entry}' is not in key:value form"
                ))),
            })
            .collect()
    }

    /// A continuation row may leave `type` blank; a different explicit type is
    /// an authoring mistake, never silently overwritten.
    fn check_type_conflict(
        &self,
        kind: &str,
        name: &str,
        existing_type: &str,
        row_type: Option<&str>,
    ) -> Result<(), ParseError> {
        match row_type {
            Some(row_type) if row_type != existing_type => Err(self.malformed(format!(
                "conflicting type '{row_type}' for {kind} '{name}' (earlier rows use '{existing_type}')"
            ))),
            _ => Ok(()),
        }
    }
}

fn template_parameter(key: &str, value: &str) -> Parameter {
    Parameter {
        key: key.to_string(),
        r#type: "template".to_string(),
        value: value.to_string(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
