use caml_merge::repair::resolution::{
    classify_first_section, classify_resolved_between, classify_sections, convert_root, drop_bill_only_elements,
    italicize_resolved, pad_paragraph_newlines, rename_bill_ids, retype_generic_ends, tag_untagged_whereas,
};
use caml_merge::{repair_resolution, SequentialIds};

#[test]
fn bill_shaped_document_becomes_resolution() {
    let text = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?><caml:MeasureDoc><caml:Bill id="bill">"#,
        r#"<caml:BillSection id="x"><caml:Content><html:p>WHEREAS, the sky is blue; and</html:p></caml:Content></caml:BillSection>"#,
        r#"<caml:BillSection id="y"><caml:Content><html:p>Resolved, That the sky is praised.</html:p></caml:Content></caml:BillSection>"#,
        r#"</caml:Bill></caml:MeasureDoc>"#
    );
    let out = repair_resolution(text, &SequentialIds::new());
    assert_eq!(
        out,
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?><caml:MeasureDoc><caml:Resolution id="resolution">"#,
            r#"<caml:WhereasClause id="id_1"><caml:Content><html:p>WHEREAS, the sky is blue; and</html:p></caml:Content></caml:WhereasClause>"#,
            r#"<caml:ResolvedClause id="id_2"><caml:Content><html:p><html:i>Resolved</html:i>, That the sky is praised.</html:p></caml:Content></caml:ResolvedClause>"#,
            r#"</caml:Resolution></caml:MeasureDoc>"#
        )
    );
}

#[test]
fn bill_references_are_renamed() {
    assert_eq!(
        rename_bill_ids(r##"<a id="bill"/><b href="#bill"/><c id="billy"/>"##),
        r##"<a id="resolution"/><b href="#resolution"/><c id="billy"/>"##
    );
}

#[test]
fn root_conversion_leaves_sections_alone() {
    assert_eq!(
        convert_root(r#"<caml:Bill id="r"><caml:BillSection/></caml:Bill>"#),
        r#"<caml:Resolution id="r"><caml:BillSection/></caml:Resolution>"#
    );
    assert_eq!(convert_root("<caml:Bill></caml:Bill>"), "<caml:Resolution></caml:Resolution>");
}

#[test]
fn bill_only_elements_are_dropped() {
    let text = "<caml:Resolution><caml:Preamble>The people enact</caml:Preamble>\n<caml:Num>1</caml:Num><x/></caml:Resolution>";
    assert_eq!(drop_bill_only_elements(text), "<caml:Resolution><x/></caml:Resolution>");
}

#[test]
fn whereas_cue_only_counts_near_paragraph_start() {
    let ids = SequentialIds::new();
    let text = concat!(
        r#"<caml:BillSection id="a"><caml:Content><html:p>  Whereas the</html:p>"#,
        r#"<caml:BillSection><caml:Content><html:p>Be it known, whereas</html:p>"#,
        r#"<caml:BillSection id="c"></caml:Content>"#
    );
    assert_eq!(
        classify_sections(text, &ids),
        concat!(
            r#"<caml:WhereasClause id="id_1"><caml:Content><html:p>  Whereas the</html:p>"#,
            r#"<caml:ResolvedClause id="id_2"><caml:Content><html:p>Be it known, whereas</html:p>"#,
            r#"<caml:ResolvedClause id="id_3"><caml:Content>"#
        )
    );
}

#[test]
fn untagged_whereas_gets_an_id() {
    let ids = SequentialIds::new();
    assert_eq!(tag_untagged_whereas("<caml:WhereasClause>x", &ids), r#"<caml:WhereasClause id="id_1">x"#);
    assert_eq!(tag_untagged_whereas(r#"<caml:WhereasClause id="k">x"#, &ids), r#"<caml:WhereasClause id="k">x"#);
}

#[test]
fn first_section_after_root_is_whereas() {
    let ids = SequentialIds::new();
    let text = "<caml:Resolution id=\"resolution\">\n  <caml:BillSection id=\"a\"><html:p>x</html:p>";
    assert_eq!(
        classify_first_section(text, &ids),
        "<caml:Resolution id=\"resolution\">\n  <caml:WhereasClause id=\"id_1\"><html:p>x</html:p>"
    );
}

#[test]
fn section_before_a_resolved_end_is_operative() {
    let ids = SequentialIds::new();
    let text = r#"</caml:WhereasClause><caml:BillSection id="b"><html:p>x</html:p></caml:ResolvedClause>"#;
    assert_eq!(
        classify_resolved_between(text, &ids),
        r#"</caml:WhereasClause><caml:ResolvedClause id="id_1"><html:p>x</html:p></caml:ResolvedClause>"#
    );

    let untouched = r#"</caml:WhereasClause><caml:BillSection id="b"></caml:BillSection>"#;
    assert_eq!(classify_resolved_between(untouched, &ids), untouched);
}

#[test]
fn generic_ends_take_the_clause_name() {
    let text = r#"<caml:WhereasClause id="a">x</caml:BillSection><caml:ResolvedClause id="b">y</caml:BillSection>"#;
    assert_eq!(
        retype_generic_ends(text),
        r#"<caml:WhereasClause id="a">x</caml:WhereasClause><caml:ResolvedClause id="b">y</caml:ResolvedClause>"#
    );
}

#[test]
fn generic_end_closing_generic_start_is_kept() {
    let text = r#"<caml:BillSection><caml:ResolvedClause id="a">x</caml:BillSection></caml:BillSection>"#;
    assert_eq!(
        retype_generic_ends(text),
        r#"<caml:BillSection><caml:ResolvedClause id="a">x</caml:ResolvedClause></caml:BillSection>"#
    );
}

#[test]
fn resolved_is_italicized_near_paragraph_start() {
    assert_eq!(
        italicize_resolved("<html:p>  resolved, That</html:p>"),
        "<html:p>  <html:i>resolved</html:i>, That</html:p>"
    );
    let late = "<html:p>Be it further resolved, That</html:p>";
    assert_eq!(italicize_resolved(late), late);
    let done = "<html:p><html:i>Resolved</html:i>, That</html:p>";
    assert_eq!(italicize_resolved(done), done);
}

#[test]
fn newlines_inside_content_paragraphs_are_padded() {
    assert_eq!(
        pad_paragraph_newlines("<caml:Content><html:p>line one\nline two\n</html:p>\n</caml:Content>"),
        "<caml:Content><html:p>line one \nline two \n</html:p>\n</caml:Content>"
    );
    let outside = "<html:p>a\nb</html:p>";
    assert_eq!(pad_paragraph_newlines(outside), outside);
}
