use crate::db::core::LayoutDB;
use crate::error::ArtError;
use std::fmt::Write as _;
use std::path::Path;

pub fn write(db: &LayoutDB, path: &Path) -> Result<(), ArtError> {
    std::fs::write(path, render(db))?;
    Ok(())
}

/// Renders the DEF text. When the database was read from a DEF, the
/// original text is kept and only the BLOCKAGES section is rewritten:
/// existing entries verbatim, followed by everything created this run.
pub fn render(db: &LayoutDB) -> String {
    let new_entries = blockage_entries(db);
    let Some(source) = &db.source else {
        return render_minimal(db, &new_entries);
    };

    let mut out = String::new();
    let push_line = |out: &mut String, line: &str| {
        out.push_str(line);
        out.push('\n');
    };

    if new_entries.is_empty() {
        for line in &source.lines {
            push_line(&mut out, line);
        }
        return out;
    }

    match source.blockage_section {
        Some((header, end)) => {
            let total = source.blockage_entries + new_entries.len();
            for line in &source.lines[..header] {
                push_line(&mut out, line);
            }
            push_line(&mut out, &format!("BLOCKAGES {} ;", total));
            for line in &source.lines[header + 1..end] {
                push_line(&mut out, line);
            }
            for entry in &new_entries {
                push_line(&mut out, entry);
            }
            for line in &source.lines[end..] {
                push_line(&mut out, line);
            }
        }
        None => {
            let at = source.insert_before.unwrap_or(source.lines.len());
            for line in &source.lines[..at] {
                push_line(&mut out, line);
            }
            push_line(&mut out, &format!("BLOCKAGES {} ;", new_entries.len()));
            for entry in &new_entries {
                push_line(&mut out, entry);
            }
            push_line(&mut out, "END BLOCKAGES");
            for line in &source.lines[at..] {
                push_line(&mut out, line);
            }
        }
    }
    out
}

fn blockage_entries(db: &LayoutDB) -> Vec<String> {
    let mut entries = Vec::with_capacity(db.blockages.len() + db.obstructions.len());
    for blk in &db.blockages {
        let mut modifiers = String::new();
        if blk.soft {
            modifiers.push_str(" + SOFT");
        } else if let Some(density) = blk.max_density {
            // A zero density is a plain (hard) blockage in DEF terms.
            if density > 0.0 && density < 100.0 {
                let _ = write!(modifiers, " + PARTIAL {}", density);
            }
        }
        let r = blk.rect;
        entries.push(format!(
            "   - PLACEMENT{} RECT ( {} {} ) ( {} {} ) ;",
            modifiers, r.min.x, r.min.y, r.max.x, r.max.y
        ));
    }
    for obs in &db.obstructions {
        let Some(layer) = db.layer(obs.layer) else {
            continue;
        };
        let r = obs.rect;
        entries.push(format!(
            "   - LAYER {} RECT ( {} {} ) ( {} {} ) ;",
            layer.name, r.min.x, r.min.y, r.max.x, r.max.y
        ));
    }
    entries
}

fn render_minimal(db: &LayoutDB, entries: &[String]) -> String {
    let mut out = String::new();
    let version = db.def_version.as_deref().unwrap_or("5.8");
    let _ = writeln!(out, "VERSION {} ;", version);
    let _ = writeln!(out, "DIVIDERCHAR \"/\" ;");
    let _ = writeln!(out, "BUSBITCHARS \"[]\" ;");
    let _ = writeln!(out, "DESIGN {} ;", db.design_name);
    let _ = writeln!(out, "UNITS DISTANCE MICRONS {} ;", db.dbu_per_micron);
    let d = db.die_area;
    let _ = writeln!(
        out,
        "DIEAREA ( {} {} ) ( {} {} ) ;",
        d.min.x, d.min.y, d.max.x, d.max.y
    );
    for row in &db.rows {
        let _ = writeln!(
            out,
            "ROW {} {} {} {} N DO {} BY {} STEP {} {} ;",
            row.name,
            row.site,
            row.origin.x,
            row.origin.y,
            row.num_x,
            row.num_y,
            row.step_x,
            row.step_y
        );
    }
    if !entries.is_empty() {
        let _ = writeln!(out, "BLOCKAGES {} ;", entries.len());
        for entry in entries {
            let _ = writeln!(out, "{}", entry);
        }
        let _ = writeln!(out, "END BLOCKAGES");
    }
    let _ = writeln!(out, "END DESIGN");
    out
}
