//! End-to-end editing scenarios on a single sheet

use comment_sheet::prelude::*;
use comment_sheet::CellKey;
use pretty_assertions::assert_eq;

fn range(s: &str) -> CellRange {
    CellRange::parse(s).unwrap()
}

#[test]
fn insert_row_shifts_cells_and_rewrites_sum() {
    let mut sheet = Sheet::new(10, 3).unwrap();
    sheet.set_value(0, 0, "1").unwrap();
    sheet.set_value(1, 0, "2").unwrap();
    sheet.set_value(2, 0, "=SUM(A1:A2)").unwrap();
    assert_eq!(sheet.display(2, 0), "3");

    sheet.insert_row(0).unwrap();

    assert_eq!(sheet.value(0, 0), "");
    assert_eq!(sheet.value(1, 0), "1");
    assert_eq!(sheet.value(2, 0), "2");
    assert_eq!(sheet.value(3, 0), "=SUM(A2:A3)");
    assert_eq!(sheet.display(3, 0), "3");
}

#[test]
fn fill_keeps_anchored_row() {
    let mut sheet = Sheet::new(10, 3).unwrap();
    sheet.set_value(0, 0, "10").unwrap();
    sheet.set_value(0, 1, "=A$1*2").unwrap();

    sheet.batch().fill_region(range("B1"), 2).unwrap();

    assert_eq!(sheet.display(0, 1), "20");
    for row in 1..=2 {
        assert_eq!(sheet.value(row, 1), "=A$1*2");
        assert_eq!(sheet.display(row, 1), "20");
    }
}

#[test]
fn mutual_references_are_cycles() {
    let mut sheet = Sheet::new(5, 5).unwrap();
    sheet.set_value(0, 0, "=B1").unwrap();
    sheet.set_value(0, 1, "=A1").unwrap();

    assert_eq!(sheet.display(0, 0), "#REF!");
    assert_eq!(sheet.display(0, 1), "#REF!");
}

#[test]
fn untaken_if_branch_is_never_evaluated() {
    let mut sheet = Sheet::new(5, 5).unwrap();
    sheet.set_value(0, 1, "7").unwrap();
    sheet.set_value(0, 0, "=IF(1=1, B1, 1/0)").unwrap();

    assert_eq!(sheet.display(0, 0), "7");
    assert_eq!(sheet.precedents(0, 0), vec![CellKey::new(0, 1)]);
    assert_eq!(sheet.last_stats().errors, 0);
}

#[test]
fn vlookup_misses_after_row_deletion() {
    let mut sheet = Sheet::new(10, 3).unwrap();
    for (row, (key, value)) in [("A", "1"), ("B", "2"), ("C", "3")].iter().enumerate() {
        sheet.set_value(row as u32 + 1, 0, *key).unwrap();
        sheet.set_value(row as u32 + 1, 1, *value).unwrap();
    }
    sheet
        .set_value(0, 0, "=VLOOKUP(\"B\", A2:B4, 2, FALSE)")
        .unwrap();
    assert_eq!(sheet.display(0, 0), "2");

    sheet.remove_row(2).unwrap();

    assert_eq!(sheet.value(0, 0), "=VLOOKUP(\"B\", A2:B3, 2, FALSE)");
    assert_eq!(sheet.display(0, 0), "#N/A");
}

#[test]
fn paste_is_one_undo_step() {
    let mut sheet = Sheet::new(10, 10).unwrap();
    sheet.set_value(5, 5, "before").unwrap();
    let before = sheet.to_table();

    sheet.batch().paste(5, 5, "x\ty\nz\tw\n").unwrap();

    assert_eq!(sheet.value(5, 5), "x");
    assert_eq!(sheet.value(5, 6), "y");
    assert_eq!(sheet.value(6, 5), "z");
    assert_eq!(sheet.value(6, 6), "w");

    assert!(sheet.undo().unwrap());
    assert_eq!(sheet.to_table(), before);
    assert_eq!(sheet.display(5, 5), "before");
}

#[test]
fn copy_then_paste_elsewhere() {
    let mut sheet = Sheet::new(10, 5).unwrap();
    sheet.set_value(0, 0, "a").unwrap();
    sheet.set_value(0, 1, "=CONCAT(A1,\"!\")").unwrap();
    let mut clipboard = MemoryClipboard::new();

    sheet.copy_to(range("A1:B1"), &mut clipboard).unwrap();
    sheet.batch().paste_from(&mut clipboard, 3, 0).unwrap();

    // Raw text is pasted; references are not adjusted
    assert_eq!(sheet.value(3, 1), "=CONCAT(A1,\"!\")");
    assert_eq!(sheet.display(3, 1), "a!");
}

#[test]
fn formula_bar_builds_a_reference_by_clicking() {
    let mut sheet = Sheet::new(10, 5).unwrap();
    sheet.set_value(0, 0, "4").unwrap();
    sheet.set_value(1, 0, "5").unwrap();

    let mut session = EditSession::new();
    session.begin(&sheet, 2, 0);
    session.set_text("=SUM(", 5);
    session.select_range(range("A1:A2"));
    session.insert(")");
    assert!(session.commit(&mut sheet).unwrap());

    assert_eq!(sheet.value(2, 0), "=SUM(A1:A2)");
    assert_eq!(sheet.display(2, 0), "9");
}

#[test]
fn undo_redo_through_mixed_commands() {
    let mut sheet = Sheet::new(10, 5).unwrap();
    sheet.set_value(0, 0, "1").unwrap();
    sheet.set_value(1, 0, "=A1+1").unwrap();
    sheet
        .toggle_font(range("A1:A2"), FontAttribute::Bold)
        .unwrap();
    sheet.insert_col(0).unwrap();
    assert_eq!(sheet.value(1, 1), "=B1+1");
    assert!(sheet.format(1, 1).font_or_default().bold);

    while sheet.undo().unwrap() {}
    assert_eq!(sheet.value(0, 0), "");
    assert_eq!(sheet.display(1, 0), "");

    while sheet.redo().unwrap() {}
    assert_eq!(sheet.value(1, 1), "=B1+1");
    assert_eq!(sheet.display(1, 1), "2");
    assert!(sheet.format(0, 1).font_or_default().bold);
}

#[test]
fn error_stays_in_its_own_cell() {
    let mut sheet = Sheet::new(10, 3).unwrap();
    sheet.set_value(0, 0, "=1/0").unwrap();
    sheet.set_value(1, 0, "5").unwrap();
    sheet.set_value(2, 0, "=SUM(A1:A2)").unwrap();
    sheet.set_value(3, 0, "=A1+A2").unwrap();

    assert_eq!(sheet.display(0, 0), "#DIV/0!");
    assert_eq!(sheet.display(2, 0), "5");
    assert_eq!(sheet.display(3, 0), "5");
    assert_eq!(sheet.last_stats().errors, 1);
}

#[test]
fn aggregates_ignore_error_cells() {
    let mut sheet = Sheet::new(10, 3).unwrap();
    sheet.set_value(0, 0, "=1/0").unwrap();
    sheet.set_value(1, 0, "4").unwrap();
    sheet.set_value(2, 0, "=NOPE()").unwrap();
    sheet.set_value(3, 0, "8").unwrap();
    sheet.set_value(0, 1, "=AVERAGE(A1:A4)").unwrap();
    sheet.set_value(1, 1, "=MIN(A1:A4)").unwrap();
    sheet.set_value(2, 1, "=MAX(A1:A4)").unwrap();
    sheet.set_value(3, 1, "=AVERAGE(A1,A3)").unwrap();

    assert_eq!(sheet.display(2, 0), "#NAME?");
    assert_eq!(sheet.display(0, 1), "6");
    assert_eq!(sheet.display(1, 1), "4");
    assert_eq!(sheet.display(2, 1), "8");
    assert_eq!(sheet.display(3, 1), "#DIV/0!");
}

#[test]
fn text_functions_clamp_huge_counts() {
    let mut sheet = Sheet::new(10, 3).unwrap();
    sheet.set_value(0, 0, "=REPLACE(\"abc\",2,1e30,\"x\")").unwrap();
    sheet.set_value(1, 0, "=MID(\"abc\",2,1e30)").unwrap();
    sheet.set_value(2, 0, "=LEFT(\"abc\",1e30)").unwrap();

    assert_eq!(sheet.display(0, 0), "ax");
    assert_eq!(sheet.display(1, 0), "bc");
    assert_eq!(sheet.display(2, 0), "abc");
}

#[test]
fn long_reverse_chain_converges_past_depth_cap() {
    let rows = 400;
    let mut sheet = Sheet::new(rows, 1).unwrap();
    sheet.set_value(rows - 1, 0, "1").unwrap();
    for row in (0..rows - 1).rev() {
        sheet.set_value(row, 0, format!("=A{}+1", row + 2)).unwrap();
    }

    assert_eq!(sheet.display(0, 0), "400");
    assert_eq!(sheet.display(143, 0), "257");
    let stats = sheet.last_stats();
    assert!(stats.converged);
    assert!(stats.sweeps > 1);
}

#[test]
fn deeply_nested_formula_is_an_error_not_a_crash() {
    let mut sheet = Sheet::new(10, 3).unwrap();
    let formula = format!("={}1{}", "(".repeat(20_000), ")".repeat(20_000));
    sheet.set_value(0, 0, formula).unwrap();
    sheet.set_value(1, 0, "=A1+2").unwrap();

    assert_eq!(sheet.display(0, 0), "#ERROR");
    assert_eq!(sheet.display(1, 0), "2");
}
