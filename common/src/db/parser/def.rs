use super::tokenize;
use crate::db::core::{DefSource, ExistingBlockage, LayoutDB, RowDef};
use crate::error::ArtError;
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use std::path::Path;

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Blockages,
    Other,
}

struct Statement<'a> {
    tokens: &'a [String],
    line: usize,
}

struct ParseState<'a> {
    path: &'a Path,
    section: Section,
    blockage_header: Option<usize>,
    source: DefSource,
}

impl ParseState<'_> {
    fn error(&self, line: usize, message: impl Into<String>) -> ArtError {
        ArtError::Def {
            path: self.path.to_path_buf(),
            line: line + 1,
            message: message.into(),
        }
    }
}

pub fn parse(db: &mut LayoutDB, path: &Path) -> Result<(), ArtError> {
    let text = std::fs::read_to_string(path)?;
    parse_str(db, &text, path)
}

/// Reads the parts of a DEF the art step needs (units, die area, rows,
/// existing blockages) and keeps the full text for write-back.
pub fn parse_str(db: &mut LayoutDB, text: &str, path: &Path) -> Result<(), ArtError> {
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut state = ParseState {
        path,
        section: Section::None,
        blockage_header: None,
        source: DefSource::default(),
    };

    let mut tokens: Vec<String> = Vec::new();
    let mut stmt_line = 0;
    // Extension text between BEGINEXT and ENDEXT has no statement syntax.
    let mut in_extension = false;
    for (idx, line) in lines.iter().enumerate() {
        for token in tokenize(line) {
            if in_extension {
                in_extension = token != "ENDEXT";
                continue;
            }
            if tokens.is_empty() {
                if token == "BEGINEXT" {
                    in_extension = true;
                    continue;
                }
                stmt_line = idx;
            }
            let terminated = token == ";";
            tokens.push(token);
            let section_end = tokens[0] == "END" && tokens.len() == 2;
            if terminated || section_end {
                let stmt = Statement {
                    tokens: &tokens,
                    line: stmt_line,
                };
                handle_statement(db, &mut state, &stmt)?;
                tokens.clear();
            }
        }
    }

    if db.die_area.width() <= 0 || db.die_area.height() <= 0 {
        return Err(state.error(lines.len(), "missing or empty DIEAREA"));
    }

    if state.source.insert_before.is_none() {
        state.source.insert_before = Some(lines.len());
    }
    state.source.lines = lines;
    db.source = Some(state.source);
    Ok(())
}

fn handle_statement(
    db: &mut LayoutDB,
    state: &mut ParseState,
    stmt: &Statement,
) -> Result<(), ArtError> {
    let parts = stmt.tokens;
    match parts[0].as_str() {
        "VERSION" if state.section == Section::None => {
            if let Some(v) = parts.get(1) {
                db.def_version = Some(v.clone());
            }
        }
        "DESIGN" if state.section == Section::None => {
            if let Some(name) = parts.get(1) {
                db.design_name = name.clone();
            }
        }
        "UNITS" => {
            if let Some(i) = parts.iter().position(|p| p == "MICRONS") {
                let value = parts
                    .get(i + 1)
                    .ok_or_else(|| state.error(stmt.line, "UNITS without a value"))?;
                db.dbu_per_micron = parse_int(state, stmt.line, value)?;
                if db.dbu_per_micron <= 0 {
                    return Err(state.error(stmt.line, "UNITS must be positive"));
                }
                log::debug!("DEF Units updated to: {}", db.dbu_per_micron);
            }
        }
        "DIEAREA" => {
            let mut i = 1;
            let points = read_points(state, stmt, &mut i)?;
            db.die_area = Rect::bounding(points)
                .ok_or_else(|| state.error(stmt.line, "DIEAREA without points"))?;
        }
        "ROW" if state.section == Section::None => {
            db.rows.push(parse_row(state, stmt)?);
        }
        "BLOCKAGES" if state.section == Section::None => {
            state.section = Section::Blockages;
            state.blockage_header = Some(stmt.line);
        }
        "SPECIALNETS" | "NETS" if state.section == Section::None => {
            if state.source.insert_before.is_none() {
                state.source.insert_before = Some(stmt.line);
            }
            state.section = Section::Other;
        }
        "END" => match parts[1].as_str() {
            "BLOCKAGES" => {
                if let Some(header) = state.blockage_header.take() {
                    state.source.blockage_section = Some((header, stmt.line));
                }
                state.section = Section::None;
            }
            "DESIGN" => {
                if state.source.insert_before.is_none() {
                    state.source.insert_before = Some(stmt.line);
                }
                state.section = Section::None;
            }
            _ => state.section = Section::None,
        },
        "-" => {
            if state.section == Section::Blockages {
                db.existing_blockages.extend(parse_blockage(state, stmt)?);
                state.source.blockage_entries += 1;
            }
        }
        // Any other header opens a section whose entries we skip.
        _ if state.section == Section::None && is_section_header(parts) => {
            state.section = Section::Other;
        }
        _ => {}
    }
    Ok(())
}

fn is_section_header(parts: &[String]) -> bool {
    matches!(
        parts[0].as_str(),
        "COMPONENTS"
            | "PINS"
            | "VIAS"
            | "REGIONS"
            | "GROUPS"
            | "FILLS"
            | "SLOTS"
            | "SCANCHAINS"
            | "NONDEFAULTRULES"
            | "STYLES"
            | "PINPROPERTIES"
            | "COMPONENTMASKSHIFT"
            | "PROPERTYDEFINITIONS"
    )
}

fn parse_row(state: &ParseState, stmt: &Statement) -> Result<RowDef, ArtError> {
    // ROW name site x y orient [DO nx BY ny [STEP sx sy]] ;
    let parts = stmt.tokens;
    if parts.len() < 6 {
        return Err(state.error(stmt.line, "truncated ROW statement"));
    }
    let mut row = RowDef {
        name: parts[1].clone(),
        site: parts[2].clone(),
        origin: Point::new(
            parse_int(state, stmt.line, &parts[3])?,
            parse_int(state, stmt.line, &parts[4])?,
        ),
        num_x: 1,
        num_y: 1,
        step_x: 0,
        step_y: 0,
    };
    let mut i = 6;
    while i < parts.len() {
        match parts[i].as_str() {
            "DO" if i + 3 < parts.len() => {
                row.num_x = parse_int(state, stmt.line, &parts[i + 1])?;
                row.num_y = parse_int(state, stmt.line, &parts[i + 3])?;
                i += 4;
            }
            "STEP" if i + 2 < parts.len() => {
                row.step_x = parse_int(state, stmt.line, &parts[i + 1])?;
                row.step_y = parse_int(state, stmt.line, &parts[i + 2])?;
                i += 3;
            }
            _ => i += 1,
        }
    }
    Ok(row)
}

fn parse_blockage(
    state: &ParseState,
    stmt: &Statement,
) -> Result<Vec<ExistingBlockage>, ArtError> {
    let parts = stmt.tokens;
    let layer = match parts.get(1).map(String::as_str) {
        Some("LAYER") => Some(
            parts
                .get(2)
                .cloned()
                .ok_or_else(|| state.error(stmt.line, "LAYER blockage without a name"))?,
        ),
        Some("PLACEMENT") => None,
        other => {
            return Err(state.error(
                stmt.line,
                format!("unknown blockage kind '{}'", other.unwrap_or("")),
            ));
        }
    };

    let mut found = Vec::new();
    let mut i = 2;
    while i < parts.len() {
        let kind = parts[i].as_str();
        i += 1;
        if kind != "RECT" && kind != "POLYGON" {
            continue;
        }
        let points = read_points(state, stmt, &mut i)?;
        let Some(rect) = Rect::bounding(points) else {
            return Err(state.error(stmt.line, format!("{} without points", kind)));
        };
        found.push(match &layer {
            Some(name) => ExistingBlockage::Routing {
                layer: name.clone(),
                rect,
            },
            None => ExistingBlockage::Placement(rect),
        });
    }
    Ok(found)
}

/// Reads consecutive `( x y )` groups starting at `*i`.
fn read_points(
    state: &ParseState,
    stmt: &Statement,
    i: &mut usize,
) -> Result<Vec<Point<i64>>, ArtError> {
    let parts = stmt.tokens;
    let mut points = Vec::new();
    while *i + 3 < parts.len() && parts[*i] == "(" {
        if parts[*i + 3] != ")" {
            return Err(state.error(stmt.line, "expected ')' after point"));
        }
        let x = parse_int(state, stmt.line, &parts[*i + 1])?;
        let y = parse_int(state, stmt.line, &parts[*i + 2])?;
        points.push(Point::new(x, y));
        *i += 4;
    }
    Ok(points)
}

fn parse_int(state: &ParseState, line: usize, token: &str) -> Result<i64, ArtError> {
    token
        .parse::<i64>()
        .or_else(|_| token.parse::<f64>().map(|v| v.round() as i64))
        .map_err(|_| state.error(line, format!("expected a number, found '{}'", token)))
}
