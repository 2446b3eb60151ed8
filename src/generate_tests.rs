use crate::error::{FormatError, ERR_PLUGIN};
use crate::format::{Formatter, OxcFormatter};
use crate::imports::ImportRecord;
use crate::ir::{
    Binding, Component, ContextGet, ContextSet, ImportDecl, ImportKind, Node, StateKind, StateValue,
};
use crate::options::{AureliaOptions, Experimental, TargetVersion};
use crate::plugins::{PluginStage, Plugins};
use crate::{compile_batch, compile_component, CompileError};

fn compile(component: &Component) -> String {
    compile_component(component, &AureliaOptions::default().unformatted())
        .expect("compile should succeed")
}

fn import(path: &str, imports: &[(&str, ImportKind)]) -> ImportDecl {
    ImportDecl {
        path: path.to_string(),
        imports: imports
            .iter()
            .map(|(name, kind)| (name.to_string(), *kind))
            .collect(),
    }
}

/// Mapper answering every import with a JSON record on the channel.
fn record_mapper() -> AureliaOptions {
    AureliaOptions::default()
        .unformatted()
        .with_import_mapper(|_, decl, _, _, path| {
            ImportRecord::for_decl(decl, path)
                .encode()
                .unwrap_or_default()
        })
}

struct Rejecting;

impl Formatter for Rejecting {
    fn format(&self, _source: &str) -> Result<String, FormatError> {
        Err(FormatError::Syntax("rejected".to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_text_bound_to_state_field() {
    let mut component = Component::new("MyComponent");
    component
        .state
        .insert("name".to_string(), StateValue::data("\"Steve\""));
    component.children = vec![Node::new("div").with_child(Node::text_binding("state.name"))];

    let code = compile(&component);
    assert!(code.contains("<div>\\${name}"), "interpolation missing: {code}");
    assert!(code.contains("name = \"Steve\";"), "state field missing: {code}");
    assert!(code.contains("export class MyComponent {"), "{code}");
    assert!(code.contains("@customElement(\"my-component\")"), "{code}");
}

#[test]
fn test_for_loop_uses_index_token() {
    let mut component = Component::new("List");
    component
        .state
        .insert("items".to_string(), StateValue::data("[1, 2, 3]"));
    component.children = vec![Node::new("ul").with_child(
        Node::for_each("item", Some("i"), "state.items")
            .with_child(Node::new("li").with_child(Node::text_binding("i"))),
    )];

    let code = compile(&component);
    assert!(code.contains("repeat.for=\"item of items\""), "{code}");
    assert!(code.contains("<li>\\${$index}"), "{code}");
    assert!(!code.contains("\\${i}"), "raw index name leaked: {code}");
}

#[test]
fn test_show_else_yields_two_adjacent_regions() {
    let mut component = Component::new("Toggle");
    component
        .state
        .insert("open".to_string(), StateValue::data("false"));
    component.children = vec![Node::show("state.open")
        .with_child(Node::text("shown"))
        .with_else(Node::text("hidden"))];

    let code = compile(&component);
    assert!(
        code.contains("<template if.bind=\"open\">shown</template><template else>"),
        "{code}"
    );
    assert_eq!(code.matches("<template else>").count(), 1);

    component.children[0].meta.else_branch = None;
    let code = compile(&component);
    assert!(code.contains("<template if.bind=\"open\">shown</template>"), "{code}");
    assert!(!code.contains("<template else>"), "{code}");
}

#[test]
fn test_child_component_becomes_template_import() {
    let mut component = Component::new("Parent");
    component.imports = vec![import("./child.lite.tsx", &[("Child", ImportKind::Default)])];
    component.children = vec![Node::new("Child").with_child(Node::text("hello"))];

    let code = compile_component(&component, &record_mapper()).unwrap();
    assert!(code.contains("<require from=\"./child\"></require>"), "{code}");
    assert!(code.contains("<child>hello"), "{code}");
    assert!(!code.contains("Child = Child"), "custom element assigned as field: {code}");
    assert!(!code.contains("import Child from"), "custom element imported in code: {code}");
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_output_is_deterministic() {
    let mut component = Component::new("Form");
    component.props = vec!["label".to_string()];
    component
        .state
        .insert("value".to_string(), StateValue::data("''"));
    component.state.insert(
        "submit".to_string(),
        StateValue::with_kind(StateKind::Method, "submit() { console.log(value) }"),
    );
    component.children = vec![Node::new("form")
        .with_binding("onSubmit", Binding::new("state.submit"))
        .with_child(Node::text_binding("props.label"))];

    let options = AureliaOptions::default();
    let first = compile_component(&component, &options).unwrap();
    let second = compile_component(&component, &options).unwrap();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_plugins_never_touch_caller_ir() {
    let mut component = Component::new("Card");
    component.children = vec![Node::new("div")];
    let original = component.clone();

    let options = AureliaOptions::default()
        .unformatted()
        .with_plugins(Plugins::new().pre_ir(|mut component| {
            component.children.push(Node::new("aside"));
            Ok(component)
        }));

    let first = compile_component(&component, &options).unwrap();
    let second = compile_component(&component, &options).unwrap();
    assert_eq!(component, original);
    assert_eq!(first, second);
    assert_eq!(first.matches("<aside>").count(), 1, "{first}");
}

#[test]
fn test_spread_arity() {
    let mut single = Component::new("One");
    single.children =
        vec![Node::new("div").with_binding("props.attrs", Binding::spread("props.attrs"))];
    let code = compile(&single);
    assert!(code.contains(" spreadProps.bind=\"attrs\""), "{code}");
    assert!(code.contains("@bindable() attrs: any;"), "{code}");

    let mut double = Component::new("Two");
    double.children = vec![Node::new("div")
        .with_binding("props.a", Binding::spread("props.a"))
        .with_binding("props.b", Binding::spread("props.b"))];
    let code = compile(&double);
    assert!(code.contains(" spreadProps0.bind=\"a\""), "{code}");
    assert!(code.contains(" spreadProps1.bind=\"b\""), "{code}");
    assert!(!code.contains("spreadProps.bind"), "{code}");
}

#[test]
fn test_import_classification_consistency() {
    let mut component = Component::new("Dashboard");
    component.imports = vec![
        import("./widget.lite.tsx", &[("Widget", ImportKind::Default)]),
        import("./format", &[("formatDate", ImportKind::Named)]),
        import("./math", &[("clamp", ImportKind::Named)]),
    ];
    component
        .state
        .insert("date".to_string(), StateValue::data("new Date()"));
    component.children = vec![Node::new("section")
        .with_child(Node::new("Widget").with_child(Node::text("w")))
        .with_child(Node::text_binding("formatDate(state.date)"))];

    let code = compile_component(&component, &record_mapper()).unwrap();
    assert!(code.contains("<require from=\"./widget\"></require>"), "{code}");
    assert!(!code.contains("Widget = Widget"), "{code}");
    assert!(code.contains("formatDate = formatDate;"), "{code}");
    assert!(code.contains("import { formatDate } from './format';"), "{code}");
    assert!(code.contains("import { clamp } from './math';"), "{code}");
    assert!(!code.contains("clamp = clamp"), "unused import assigned: {code}");
}

#[test]
fn test_format_failure_returns_unformatted_code() {
    let mut component = Component::new("Broken");
    component.children = vec![Node::new("p").with_child(Node::text("text"))];

    let rejected = compile_component(
        &component,
        &AureliaOptions::default().with_formatter(Rejecting),
    )
    .expect("format failure must not fail the compile");
    assert_eq!(rejected, compile(&component));
}

#[test]
fn test_default_formatter_keeps_class() {
    let mut component = Component::new("Pretty");
    component
        .state
        .insert("count".to_string(), StateValue::data("0"));
    component.children = vec![Node::new("span").with_child(Node::text_binding("state.count"))];

    let code = compile_component(&component, &AureliaOptions::default()).unwrap();
    assert!(code.contains("class Pretty"), "{code}");
    assert!(code.contains("inlineView"), "{code}");
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLUGINS, OPTIONS, CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_code_plugins_wrap_formatting() {
    let options = AureliaOptions::default()
        .unformatted()
        .with_plugins(
            Plugins::new()
                .pre_code(|code| Ok(format!("{code}// pre\n")))
                .post_code(|code| Ok(format!("{code}// post"))),
        );

    let code = compile_component(&Component::new("Plain"), &options).unwrap();
    assert!(code.ends_with("// pre\n// post"), "{code}");
}

#[test]
fn test_plugin_failure_propagates() {
    let options = AureliaOptions::default().with_plugins(
        Plugins::new().pre_code(|_| Err("boom".into())),
    );

    let err = compile_component(&Component::new("Plain"), &options).unwrap_err();
    assert_eq!(err.code(), ERR_PLUGIN);
    match err {
        CompileError::Plugin { stage, source } => {
            assert_eq!(stage, PluginStage::PreCode);
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_suppressed_compile_is_empty() {
    let mut component = Component::new("Anything");
    component.children = vec![Node::new("For")];
    let code = compile_component(&component, &AureliaOptions::default().suppressed()).unwrap();
    assert_eq!(code, "");
}

#[test]
fn test_malformed_ir_fails_fast() {
    let mut component = Component::new("Broken");
    component.children = vec![Node::new("Show").with_child(Node::text("x"))];
    let err = compile_component(&component, &AureliaOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::MalformedIr { .. }), "{err}");
}

#[test]
fn test_v2_uses_import_element_without_wrapper() {
    let mut component = Component::new("Parent");
    component.imports = vec![import("./child", &[("Child", ImportKind::Default)])];
    component.children = vec![Node::new("Child").with_child(Node::text("x"))];

    let options = record_mapper().with_version(TargetVersion::V2);
    let code = compile_component(&component, &options).unwrap();
    assert!(code.contains("<import from=\"./child\"></import>"), "{code}");
    assert!(!code.contains("<template>"), "{code}");
}

#[test]
fn test_context_reads_and_writes() {
    let mut component = Component::new("Provider");
    component.context.get.insert(
        "theme".to_string(),
        ContextGet {
            name: "ThemeContext".to_string(),
            type_name: None,
        },
    );
    component.context.set = vec![ContextSet {
        name: "UserContext".to_string(),
        value: None,
        reference: Some("state.user".to_string()),
    }];
    component
        .state
        .insert("user".to_string(), StateValue::data("null"));

    let code = compile(&component);
    assert!(
        code.starts_with("import { EventAggregator } from 'aurelia-event-aggregator';"),
        "{code}"
    );
    assert!(code.contains("autoinject"), "{code}");
    assert!(code.contains("@autoinject\n"), "{code}");
    assert!(
        code.contains("constructor(\n  private eventAggregator: EventAggregator,\n  public theme: ThemeContext\n)"),
        "{code}"
    );
    assert!(code.contains("attached() {\nthis.getContext();\nthis.setContext();\n}"), "{code}");
    assert!(code.contains("this.eventAggregator.publish(UserContext.key, this.user);"), "{code}");
    assert!(code.contains("this.eventAggregator.subscribe(ThemeContext.key"), "{code}");
}

#[test]
fn test_context_reads_only_skip_aggregator_import() {
    let mut component = Component::new("Consumer");
    component.context.get.insert(
        "theme".to_string(),
        ContextGet {
            name: "ThemeContext".to_string(),
            type_name: Some("Theme".to_string()),
        },
    );

    let options = AureliaOptions::default()
        .unformatted()
        .with_experimental(Experimental {
            inject: true,
            ..Experimental::default()
        });
    let code = compile_component(&component, &options).unwrap();
    assert!(!code.contains("aurelia-event-aggregator"), "{code}");
    assert!(!code.contains("@autoinject"), "{code}");
    assert!(
        code.contains("@Inject(forwardRef(() => Theme)) public theme: Theme"),
        "{code}"
    );
}

#[test]
fn test_checkbox_change_is_not_delegated() {
    let mut component = Component::new("Check");
    component.state.insert(
        "toggle".to_string(),
        StateValue::with_kind(StateKind::Method, "toggle() {}"),
    );
    component.children = vec![
        Node::new("input")
            .with_property("type", "checkbox")
            .with_binding("onChange", Binding::new("state.toggle")),
        Node::new("input")
            .with_property("type", "text")
            .with_binding("onChange", Binding::new("state.toggle")),
    ];

    let code = compile(&component);
    assert_eq!(code.matches(".delegate=").count(), 1, "{code}");
    assert!(code.contains("input.delegate=\"toggle()\""), "{code}");
}

#[test]
fn test_refs_and_outputs() {
    let mut component = Component::new("Field");
    component.outputs = vec!["onSave".to_string()];
    component.children = vec![Node::new("input")
        .with_binding("ref", Binding::new("inputRef"))
        .with_binding("onBlur", Binding::new("props.onSave(event.target.value)"))];

    let code = compile(&component);
    assert!(code.contains("ref=\"inputRef\""), "{code}");
    assert!(code.contains("inputRef: HTMLElement;"), "{code}");
    assert!(code.contains("@bindable() onSave: (...args: any[]) => void;"), "{code}");
    assert!(!code.contains("@bindable() onSave: any"), "output declared as prop: {code}");
    assert!(code.contains("blur.delegate=\"onSave($event.target.value)\""), "{code}");
}

#[test]
fn test_compile_from_json_ir() {
    let json = serde_json::json!({
        "name": "Greeting",
        "state": { "who": { "code": "'world'", "type": "property" } },
        "children": [{
            "name": "h1",
            "children": [{ "name": "div", "bindings": { "_text": { "code": "state.who" } } }]
        }]
    });
    let component = Component::from_json(&json.to_string()).unwrap();
    let code = compile(&component);
    assert!(code.contains("<h1>\\${who}"), "{code}");
    assert!(code.contains("who = 'world';"), "{code}");
}

#[test]
fn test_batch_keeps_input_order() {
    let components: Vec<Component> = ["Alpha", "Beta", "Gamma"]
        .into_iter()
        .map(Component::new)
        .collect();
    let results = compile_batch(&components, &AureliaOptions::default().unformatted());

    assert_eq!(results.len(), 3);
    for (component, result) in components.iter().zip(results) {
        let code = result.unwrap();
        assert!(code.contains(&format!("export class {} {{}}", component.name)), "{code}");
    }
}

#[test]
fn test_backslashes_survive_inline_view() {
    let mut component = Component::new("Path");
    component.css = Some(r#"p::before { content: "\201C"; }"#.to_string());
    component.children = vec![Node::new("p").with_child(Node::text(r"C:\temp\new"))];

    let code = compile(&component);
    assert!(code.contains(r"C:\\temp\\new"), "{code}");
    assert!(code.contains(r#"content: "\\201C""#), "{code}");
    assert!(OxcFormatter.format(&code).is_ok(), "output must parse: {code}");
}
