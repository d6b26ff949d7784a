//! Markdown export of a whole document.
//!
//! Lossy by nature: alignment is dropped, payload blocks become their
//! closest markdown equivalent (pipe table, image link, task list, event
//! list). Blocks are separated by a blank line, except consecutive list
//! items which stay together.

use folio_types::{Alignment, Block, BlockKind, Payload, TablePayload};

use crate::format;

/// Render blocks as markdown.
pub fn to_markdown(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut number = 0usize;
    let mut previous: Option<BlockKind> = None;

    for block in blocks {
        number = if block.kind == BlockKind::NumberedItem { number + 1 } else { 0 };
        if let Some(prev) = previous {
            let same_list = prev == block.kind && block.kind.is_list();
            out.push_str(if same_list { "\n" } else { "\n\n" });
        }
        out.push_str(&block_markdown(block, number));
        previous = Some(block.kind);
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn block_markdown(block: &Block, number: usize) -> String {
    let inline = || format::to_markdown(&block.text, &block.formats);
    match block.kind {
        BlockKind::Paragraph => inline(),
        BlockKind::Heading1 => format!("# {}", inline()),
        BlockKind::Heading2 => format!("## {}", inline()),
        BlockKind::Heading3 => format!("### {}", inline()),
        BlockKind::BulletedItem => format!("- {}", inline()),
        BlockKind::NumberedItem => format!("{number}. {}", inline()),
        BlockKind::Quote => inline()
            .lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        // Code blocks keep their raw text; inline markers would be literal.
        BlockKind::Code => format!("```\n{}\n```", block.text),
        BlockKind::Divider => "---".to_string(),
        BlockKind::Table | BlockKind::Image | BlockKind::Calendar | BlockKind::Checklist => {
            match &block.payload {
                Some(payload) => payload_markdown(payload),
                None => String::new(),
            }
        }
    }
}

fn payload_markdown(payload: &Payload) -> String {
    match payload {
        Payload::Table(table) => table_markdown(table),
        Payload::Image(image) => {
            let mut out = format!("![{}]({})", image.alt, image.src);
            if !image.caption.is_empty() {
                out.push_str(&format!("\n*{}*", image.caption));
            }
            out
        }
        Payload::Checklist(list) => {
            let mut lines = vec![format!("**{}**", list.title)];
            lines.extend(
                list.items
                    .iter()
                    .map(|item| format!("- [{}] {}", if item.completed { "x" } else { " " }, item.text)),
            );
            lines.join("\n")
        }
        Payload::Calendar(calendar) => {
            let mut lines = vec![format!("**Calendar** ({})", calendar.current_date.format("%B %Y"))];
            lines.extend(calendar.agenda().into_iter().map(|event| {
                let mut line = format!("- {} {}", event.date.format("%Y-%m-%d"), event.title);
                if let Some(time) = &event.time {
                    line.push_str(&format!(" at {time}"));
                }
                line
            }));
            lines.join("\n")
        }
    }
}

fn table_markdown(table: &TablePayload) -> String {
    let width = table.column_count();
    if width == 0 {
        return String::new();
    }
    let row_line = |cells: &[String]| {
        let padded: Vec<&str> = (0..width)
            .map(|c| cells.get(c).map(String::as_str).unwrap_or(""))
            .collect();
        format!("| {} |", padded.join(" | "))
    };
    let rule = (0..width)
        .map(|c| match table.column_alignment(c) {
            Alignment::Left => "---",
            Alignment::Center => ":---:",
            Alignment::Right => "---:",
        })
        .collect::<Vec<_>>()
        .join(" | ");

    let (header, body) = if table.headers {
        (row_line(table.rows[0].as_slice()), &table.rows[1..])
    } else {
        (row_line(&[]), &table.rows[..])
    };

    let mut lines = vec![header, format!("| {rule} |")];
    lines.extend(body.iter().map(|row| row_line(row.as_slice())));
    lines.join("\n")
}
