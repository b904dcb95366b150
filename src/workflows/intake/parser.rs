use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug)]
pub(crate) struct ParsedJobRow {
    pub(crate) title: String,
    pub(crate) family: String,
    pub(crate) level: String,
    pub(crate) summary: Option<String>,
    pub(crate) responsibilities: Vec<String>,
}

pub(crate) fn parse_job_rows<R: Read>(reader: R) -> Result<Vec<ParsedJobRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<JobRow>() {
        let row = record?;
        rows.push(ParsedJobRow {
            title: row.title.trim().to_string(),
            family: row.family.trim().to_string(),
            level: row.level.trim().to_string(),
            summary: row.summary,
            responsibilities: split_responsibilities(&row.responsibilities),
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct JobRow {
    #[serde(rename = "Job Title", default)]
    title: String,
    #[serde(rename = "Job Family", default)]
    family: String,
    #[serde(rename = "Job Level", default)]
    level: String,
    #[serde(rename = "Summary", default, deserialize_with = "empty_string_as_none")]
    summary: Option<String>,
    #[serde(rename = "Responsibilities", default)]
    responsibilities: String,
}

#[derive(Debug)]
pub(crate) struct ParsedLibraryRow {
    pub(crate) name: String,
    pub(crate) definition: String,
    pub(crate) indicators: Vec<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) source_evidence: Option<String>,
}

pub(crate) fn parse_library_rows<R: Read>(reader: R) -> Result<Vec<ParsedLibraryRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<LibraryRow>() {
        let row = record?;
        rows.push(ParsedLibraryRow {
            name: row.name.trim().to_string(),
            definition: row.definition.trim().to_string(),
            indicators: split_list(&row.indicators),
            tags: split_list(&row.tags),
            source_evidence: row.source_evidence,
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct LibraryRow {
    #[serde(rename = "Competency Name", default)]
    name: String,
    #[serde(rename = "Definition", default)]
    definition: String,
    #[serde(rename = "Indicators", default)]
    indicators: String,
    #[serde(rename = "Tags", default)]
    tags: String,
    #[serde(rename = "Source", default, deserialize_with = "empty_string_as_none")]
    source_evidence: Option<String>,
}

#[derive(Debug)]
pub(crate) struct ParsedReferenceRow {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) tags: Vec<String>,
}

pub(crate) fn parse_reference_rows<R: Read>(
    reader: R,
) -> Result<Vec<ParsedReferenceRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<ReferenceRow>() {
        let row = record?;
        rows.push(ParsedReferenceRow {
            title: row.title.trim().to_string(),
            body: row.body.trim().to_string(),
            tags: split_list(&row.tags),
        });
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "Tags", default)]
    tags: String,
}

/// Responsibilities arrive newline-, bullet-, or number-delimited.
pub(crate) fn split_responsibilities(raw: &str) -> Vec<String> {
    raw.lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim();
    let without_bullet = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("\u{2022} "))
        .unwrap_or(trimmed);

    // "1. " / "12) " style numbering.
    let digits = without_bullet
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits > 0 {
        let rest = &without_bullet[digits..];
        if let Some(stripped) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return stripped.trim();
        }
    }

    without_bullet.trim()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(['\n', ';'])
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
pub(crate) fn split_responsibilities_for_tests(raw: &str) -> Vec<String> {
    split_responsibilities(raw)
}
