use jsguard_features::config::SyntacticConfig;
use jsguard_features::features::syntactic::{count_node_types, parse_script, NodeCounts, ParseError, ParseLimits};
use jsguard_features::features::{NodeType, SyntacticExtractor};
use jsguard_features::table::{ColumnGroup, FeatureTable, Sample};

fn syn(table: &FeatureTable, name: &str, row: usize) -> f64 {
    table.get(ColumnGroup::Syntactic, name).map_or(0.0, |c| c[row])
}

#[test]
fn nested_calls_are_counted() {
    let counts = count_node_types("eval(unescape('%61'))", &ParseLimits::default()).unwrap();
    assert_eq!(counts[&NodeType::CallExpression], 2);
    assert_eq!(counts[&NodeType::Program], 1);
    assert_eq!(counts[&NodeType::ExpressionStatement], 1);
    assert_eq!(counts[&NodeType::Identifier], 2);
    assert_eq!(counts[&NodeType::Literal], 1);
}

#[test]
fn identifier_names_do_not_change_counts() {
    let limits = ParseLimits::default();
    let a = count_node_types("var a=1;", &limits).unwrap();
    let b = count_node_types("var b=1;", &limits).unwrap();
    assert_eq!(a, b);
    assert_eq!(a[&NodeType::VariableDeclaration], 1);
    assert_eq!(a[&NodeType::VariableDeclarator], 1);
}

#[test]
fn empty_source_is_an_empty_program() {
    let counts = count_node_types("", &ParseLimits::default()).unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[&NodeType::Program], 1);
}

#[test]
fn logical_and_sequence_are_distinguished_from_binary() {
    let counts = count_node_types("a && b; a + b; a, b;", &ParseLimits::default()).unwrap();
    assert_eq!(counts[&NodeType::LogicalExpression], 1);
    assert_eq!(counts[&NodeType::BinaryExpression], 1);
    assert_eq!(counts[&NodeType::SequenceExpression], 1);
}

#[test]
fn parentheses_are_transparent() {
    let limits = ParseLimits::default();
    assert_eq!(
        count_node_types("x = (1);", &limits).unwrap(),
        count_node_types("x = 1;", &limits).unwrap()
    );
}

#[test]
fn syntax_errors_are_reported() {
    assert!(matches!(
        parse_script("{", &ParseLimits::default()),
        Err(ParseError::Syntax(_))
    ));
}

#[test]
fn adversarial_nesting_is_rejected_without_parsing() {
    let source = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
    assert!(matches!(
        parse_script(&source, &ParseLimits::default()),
        Err(ParseError::TooDeep { depth: 100_000, .. })
    ));
}

#[test]
fn parsing_without_timeout_waits_for_result() {
    let limits = ParseLimits {
        timeout: None,
        ..ParseLimits::default()
    };
    let counts = count_node_types("if (x) { y(); }", &limits).unwrap();
    assert_eq!(counts[&NodeType::IfStatement], 1);
    assert_eq!(counts[&NodeType::BlockStatement], 1);
}

fn too_deep(source: &str) -> bool {
    matches!(
        parse_script(source, &ParseLimits::default()),
        Err(ParseError::TooDeep { .. })
    )
}

#[test]
fn operator_chains_are_rejected_before_parsing() {
    assert!(too_deep(&format!("{}x", "!".repeat(200_000))));
    assert!(too_deep(&format!("{}a", "a+".repeat(1_000_000))));
    assert!(too_deep(&format!("{}a", "a=".repeat(100_000))));
    assert!(too_deep(&format!("{}c{}", "c?".repeat(100_000), ":c".repeat(100_000))));
    assert!(too_deep(&format!("{}x;", "if(1)".repeat(100_000))));
    assert!(too_deep(&format!("{}x", "typeof ".repeat(100_000))));
}

#[test]
fn unary_chain_reports_its_length() {
    let limits = ParseLimits::default();
    assert_eq!(
        parse_script(&format!("{}x", "!".repeat(200_000)), &limits).unwrap_err(),
        ParseError::TooDeep {
            depth: 200_000,
            limit: limits.max_nesting_depth
        }
    );
    assert_eq!(
        parse_script(&format!("{}a", "a+".repeat(1_000_000)), &limits).unwrap_err(),
        ParseError::TooDeep {
            depth: 1_000_000,
            limit: limits.max_expression_depth
        }
    );
}

#[test]
fn long_but_shallow_sources_still_parse() {
    let limits = ParseLimits::default();
    let array = format!("var a = [{}1];", "1,".repeat(9_999));
    assert_eq!(count_node_types(&array, &limits).unwrap()[&NodeType::Literal], 10_000);

    let concat = format!("s = {}'a';", "'a' + ".repeat(2_000));
    assert_eq!(count_node_types(&concat, &limits).unwrap()[&NodeType::BinaryExpression], 2_000);

    let statements = "x = y + 1;\n".repeat(5_000);
    assert_eq!(
        count_node_types(&statements, &limits).unwrap()[&NodeType::ExpressionStatement],
        5_000
    );
}

#[test]
fn deep_rows_do_not_take_the_batch_down() {
    let table = FeatureTable::from_sources([
        "f(x);".to_string(),
        format!("{}x", "!".repeat(200_000)),
        format!("{}a", "a+".repeat(1_000_000)),
        "g(y);".to_string(),
    ]);
    let (out, report) = SyntacticExtractor::new(&SyntacticConfig::default())
        .extract(&table)
        .unwrap();
    assert_eq!(out.len(), 4);
    assert_eq!(report.parsed, 2);
    let failed: Vec<usize> = report.failures.iter().map(|(row, _)| *row).collect();
    assert_eq!(failed, vec![1, 2]);
    assert_eq!(syn(&out, "CallExpression", 3), 1.0);
    assert_eq!(syn(&out, "UnaryExpression", 1), 0.0);
}

fn counts(source: &str) -> NodeCounts {
    count_node_types(source, &ParseLimits::default()).unwrap()
}

fn count(counts: &NodeCounts, kind: NodeType) -> u32 {
    counts.get(&kind).copied().unwrap_or(0)
}

#[test]
fn member_property_names_are_identifiers() {
    let c = counts("document.write(x)");
    assert_eq!(count(&c, NodeType::Identifier), 3);
    assert_eq!(count(&c, NodeType::MemberExpression), 1);
    assert_eq!(count(&c, NodeType::CallExpression), 1);
    // computed access names its property with the expression itself
    assert_eq!(count(&counts("a[b]"), NodeType::Identifier), 2);
}

#[test]
fn object_keys_are_properties() {
    let c = counts("({a: 1})");
    assert_eq!(count(&c, NodeType::ObjectExpression), 1);
    assert_eq!(count(&c, NodeType::Property), 1);
    assert_eq!(count(&c, NodeType::Identifier), 1);
    assert_eq!(count(&c, NodeType::Literal), 1);

    let c = counts("({a, ...b, m() {}})");
    assert_eq!(count(&c, NodeType::Property), 2);
    assert_eq!(count(&c, NodeType::SpreadElement), 1);
    assert_eq!(count(&c, NodeType::FunctionExpression), 1);
}

#[test]
fn function_parameters_and_body() {
    let c = counts("function f(x){return x}");
    assert_eq!(count(&c, NodeType::FunctionDeclaration), 1);
    assert_eq!(count(&c, NodeType::Identifier), 3);
    assert_eq!(count(&c, NodeType::BlockStatement), 1);
    assert_eq!(count(&c, NodeType::ReturnStatement), 1);
    assert_eq!(count(&c, NodeType::VariableDeclarator), 0);

    let c = counts("function g(a = 1, ...rest){}");
    assert_eq!(count(&c, NodeType::AssignmentPattern), 1);
    assert_eq!(count(&c, NodeType::RestElement), 1);
    assert_eq!(count(&c, NodeType::VariableDeclarator), 0);
}

#[test]
fn regex_literals_are_literals() {
    let c = counts("/r/");
    assert_eq!(count(&c, NodeType::Literal), 1);
    assert_eq!(count(&c, NodeType::ExpressionStatement), 1);
}

#[test]
fn loop_declarations_have_a_declaration_node() {
    let c = counts("for(var i=0;;){}");
    assert_eq!(count(&c, NodeType::ForStatement), 1);
    assert_eq!(count(&c, NodeType::VariableDeclaration), 1);
    assert_eq!(count(&c, NodeType::VariableDeclarator), 1);
    assert_eq!(count(&c, NodeType::BlockStatement), 1);

    let c = counts("for (let k in o) {}");
    assert_eq!(count(&c, NodeType::VariableDeclaration), 1);
    assert_eq!(count(&c, NodeType::VariableDeclarator), 1);
}

#[test]
fn patterns_templates_and_classes() {
    let c = counts("var {a} = o, [b] = p;");
    assert_eq!(count(&c, NodeType::ObjectPattern), 1);
    assert_eq!(count(&c, NodeType::ArrayPattern), 1);
    assert_eq!(count(&c, NodeType::VariableDeclarator), 2);

    let c = counts("`a${b}c`");
    assert_eq!(count(&c, NodeType::TemplateLiteral), 1);
    assert_eq!(count(&c, NodeType::TemplateElement), 2);

    let c = counts("class A extends B { m() { return super.m(); } static { x = 1; } }");
    assert_eq!(count(&c, NodeType::ClassDeclaration), 1);
    assert_eq!(count(&c, NodeType::ClassBody), 1);
    assert_eq!(count(&c, NodeType::MethodDefinition), 1);
    assert_eq!(count(&c, NodeType::StaticBlock), 1);
    assert_eq!(count(&c, NodeType::Super), 1);
}

#[test]
fn invalid_rows_keep_sample_fields_and_read_zero() {
    let samples = vec![
        Sample {
            js: Some("eval(unescape('%61'))".into()),
            js_filename: Some("a.js".into()),
            malicious: Some(true),
            obfuscated: Some(false),
        },
        Sample {
            js: Some("{".into()),
            js_filename: Some("b.js".into()),
            malicious: Some(false),
            obfuscated: None,
        },
    ];
    let table = FeatureTable::new(samples);
    let (out, report) = SyntacticExtractor::new(&SyntacticConfig::default())
        .extract(&table)
        .unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out.samples(), table.samples());
    assert_eq!(report.parsed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, 1);

    assert_eq!(syn(&out, "CallExpression", 0), 2.0);
    for key in out.keys_in(Some(ColumnGroup::Syntactic)) {
        assert_eq!(out.value(1, &key), Some(0.0), "{}", key);
    }
}

#[test]
fn batch_taxonomy_is_union_of_parsed_rows() {
    let table = FeatureTable::from_sources(["f();", "var a = [1];", "}}}"]);
    let (out, report) = SyntacticExtractor::new(&SyntacticConfig::default())
        .extract(&table)
        .unwrap();
    assert!(report.taxonomy.contains(&NodeType::CallExpression));
    assert!(report.taxonomy.contains(&NodeType::ArrayExpression));
    assert_eq!(out.keys_in(Some(ColumnGroup::Syntactic)).len(), report.taxonomy.len());
    assert_eq!(syn(&out, "CallExpression", 1), 0.0);
    assert_eq!(syn(&out, "ArrayExpression", 1), 1.0);
}

#[test]
fn parallel_and_sequential_extraction_agree() {
    let sources: Vec<String> = (0..40)
        .map(|i| match i % 3 {
            0 => format!("function f{}(a) {{ return a + {}; }}", i, i),
            1 => format!("for (var i = 0; i < {}; i++) {{ s += i; }}", i),
            _ => "((".to_string(),
        })
        .collect();
    let table = FeatureTable::from_sources(sources);
    let one = SyntacticExtractor::new(&SyntacticConfig {
        workers: 1,
        ..SyntacticConfig::default()
    });
    let many = SyntacticExtractor::new(&SyntacticConfig {
        workers: 4,
        ..SyntacticConfig::default()
    });
    let (a, _) = one.extract(&table).unwrap();
    let (b, _) = many.extract(&table).unwrap();
    assert_eq!(a, b);
}

#[test]
fn fixed_taxonomy_controls_columns() {
    let taxonomy = [NodeType::Program, NodeType::CallExpression, NodeType::WhileStatement];
    let table = FeatureTable::from_sources(["a.b(c);"]);
    let (out, report) = SyntacticExtractor::new(&SyntacticConfig::default())
        .apply_taxonomy(&table, &taxonomy)
        .unwrap();
    let names: Vec<String> = out.column_keys().map(|k| k.name.clone()).collect();
    assert_eq!(names, vec!["Program", "CallExpression", "WhileStatement"]);
    assert_eq!(syn(&out, "WhileStatement", 0), 0.0);
    assert!(report.unseen.contains(&NodeType::MemberExpression));
}
