//! DOM helpers for walking HTML tables.
//!
//! Grade pages often nest layout tables inside each other, so every helper
//! here only looks at rows that belong to the given table, never at rows of
//! a table nested inside one of its cells.

use scraper::ElementRef;

use crate::normalize::collapse_whitespace;

/// Returns the closest `<table>` ancestor of an element.
fn owning_table(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
}

/// Returns the `<tr>` rows owned by `table`, in document order.
#[must_use]
pub fn own_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .filter(|row| owning_table(*row).is_some_and(|t| t.id() == table.id()))
        .collect()
}

/// Returns `true` if the row sits inside a `<thead>` section.
#[must_use]
pub fn in_thead(row: ElementRef<'_>) -> bool {
    row.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|p| p.value().name() == "thead")
}

/// Returns the `<td>`/`<th>` cell elements of a row.
#[must_use]
pub fn cell_elements(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

/// Returns the whitespace-collapsed text of every cell in a row.
#[must_use]
pub fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    cell_elements(row).into_iter().map(cell_text).collect()
}

/// Returns the whitespace-collapsed text content of a cell.
#[must_use]
pub fn cell_text(cell: ElementRef<'_>) -> String {
    collapse_whitespace(&cell.text().collect::<String>())
}

/// Picks the header rows of a table: every `<thead>` row that has cells,
/// otherwise the first row that has any cells.
#[must_use]
pub fn header_rows<'a>(rows: &[ElementRef<'a>]) -> Vec<ElementRef<'a>> {
    let has_cells = |row: &ElementRef<'a>| !cell_elements(*row).is_empty();
    let thead: Vec<ElementRef<'a>> = rows
        .iter()
        .copied()
        .filter(|row| in_thead(*row))
        .filter(has_cells)
        .collect();
    if !thead.is_empty() {
        return thead;
    }
    rows.iter().copied().find(has_cells).into_iter().collect()
}

/// Upper bound for `colspan`/`rowspan` values.
const MAX_SPAN: usize = 1000;

/// Reads a `colspan`/`rowspan` attribute, defaulting to 1.
fn span(cell: ElementRef<'_>, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map_or(1, |n| n.clamp(1, MAX_SPAN))
}

/// Flattens header rows into one text per column.
///
/// `colspan` and `rowspan` are expanded so indices line up with the data
/// cells. When a column is covered by several rows, the lowest non-empty
/// cell wins, so a group label such as "Certámenes" above `C1`..`C4` gives
/// way to the per-column labels.
#[must_use]
pub fn header_texts(header_rows: &[ElementRef<'_>]) -> Vec<String> {
    let mut texts: Vec<String> = Vec::new();
    // Rows still covered below the current one by an earlier `rowspan`.
    let mut carried: Vec<usize> = Vec::new();

    for row in header_rows {
        let occupied: Vec<bool> = carried.iter().map(|n| *n > 0).collect();
        let mut col = 0;

        for cell in cell_elements(*row) {
            while occupied.get(col).copied().unwrap_or(false) {
                col += 1;
            }
            let text = cell_text(cell);
            let width = span(cell, "colspan");
            let height = span(cell, "rowspan");

            if texts.len() < col + width {
                texts.resize(col + width, String::new());
                carried.resize(col + width, 0);
            }
            let columns = col..col + width;
            for (slot, below) in texts[columns.clone()].iter_mut().zip(&mut carried[columns]) {
                if !text.is_empty() {
                    slot.clone_from(&text);
                }
                *below = height - 1;
            }
            col += width;
        }

        for (below, was_occupied) in carried.iter_mut().zip(occupied) {
            if was_occupied {
                *below = below.saturating_sub(1);
            }
        }
    }

    texts
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::*;

    fn first_table(document: &Html) -> ElementRef<'_> {
        let sel = Selector::parse("table").unwrap();
        document.select(&sel).next().unwrap()
    }

    #[test]
    fn skips_rows_of_nested_tables() {
        let document = Html::parse_document(
            "<table>
               <tr><td>a</td><td><table><tr><td>inner</td></tr></table></td></tr>
               <tr><td>b</td></tr>
             </table>",
        );
        let table = first_table(&document);
        let rows = own_rows(table);
        assert_eq!(rows.len(), 2);
        assert_eq!(row_cells(rows[1]), vec!["b"]);
    }

    #[test]
    fn prefers_thead_for_header() {
        let document = Html::parse_document(
            "<table>
               <thead><tr><th>Código</th><th>Nombre</th></tr></thead>
               <tbody><tr><td>MAT-1001</td><td>Cálculo</td></tr></tbody>
             </table>",
        );
        let rows = own_rows(first_table(&document));
        let header = header_rows(&rows);
        assert_eq!(header.len(), 1);
        assert!(in_thead(header[0]));
        assert_eq!(header_texts(&header), vec!["Código", "Nombre"]);
    }

    #[test]
    fn falls_back_to_first_row_with_cells() {
        let document = Html::parse_document(
            "<table><tr></tr><tr><td> Ramo </td></tr><tr><td>x</td></tr></table>",
        );
        let rows = own_rows(first_table(&document));
        let header = header_rows(&rows);
        assert_eq!(header.len(), 1);
        assert_eq!(header_texts(&header), vec!["Ramo"]);
    }

    #[test]
    fn flattens_grouped_thead() {
        let document = Html::parse_document(
            "<table>
               <thead>
                 <tr>
                   <th rowspan=\"2\">Código</th><th rowspan=\"2\">Nombre</th>
                   <th colspan=\"4\">Certámenes</th><th rowspan=\"2\">Examen</th>
                 </tr>
                 <tr><th>C1</th><th>C2</th><th>C3</th><th>C4</th></tr>
               </thead>
               <tbody><tr><td>MAT-1001</td><td>Cálculo</td></tr></tbody>
             </table>",
        );
        let rows = own_rows(first_table(&document));
        let header = header_rows(&rows);
        assert_eq!(header.len(), 2);
        assert_eq!(
            header_texts(&header),
            vec!["Código", "Nombre", "C1", "C2", "C3", "C4", "Examen"]
        );
    }

    #[test]
    fn repeats_group_label_without_sub_row() {
        let document = Html::parse_document(
            "<table><tr><th>Ramo</th><th colspan=\"2\">Nota</th><th>Estado</th></tr></table>",
        );
        let rows = own_rows(first_table(&document));
        assert_eq!(
            header_texts(&header_rows(&rows)),
            vec!["Ramo", "Nota", "Nota", "Estado"]
        );
    }

    #[test]
    fn collapses_cell_whitespace() {
        let document =
            Html::parse_document("<table><tr><td>  Cálculo\n   <b>I</b> </td></tr></table>");
        let rows = own_rows(first_table(&document));
        assert_eq!(row_cells(rows[0]), vec!["Cálculo I"]);
    }
}
