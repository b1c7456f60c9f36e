//! End-to-end editing sessions through the public API.

use std::cell::RefCell;
use std::future::{Future, ready};
use std::pin::pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use jotter_editor_core::serialize::{self, HtmlOptions};
use jotter_editor_core::{
    Caret, CaretGeometry, CodeSurface, CursorRect, Document, Editor, EditorConfig, Key, KeyCombo,
    KeyDisposition, Node, NodeKind, PopupContent, PopupRenderer, SurfaceError, SurfaceLoader,
    SurfaceSeed, default_catalog,
};
use web_time::Instant;

#[derive(Default)]
struct Host {
    visible: bool,
    titles: Vec<String>,
}

impl CaretGeometry for Host {
    fn caret_rect(&self, caret: Caret) -> Option<CursorRect> {
        Some(CursorRect::new(caret.offset as f64 * 7.5, 10.0, 1.0, 18.0))
    }
}

impl PopupRenderer for Host {
    fn show(&mut self, anchor: CursorRect, content: &PopupContent) {
        self.visible = true;
        self.update(anchor, content);
    }

    fn update(&mut self, _: CursorRect, content: &PopupContent) {
        self.titles = match content {
            PopupContent::Items { items, .. } => items.iter().map(|i| i.title.clone()).collect(),
            PopupContent::NoMatches => Vec::new(),
        };
    }

    fn hide(&mut self) {
        self.visible = false;
    }
}

#[derive(Clone, Default)]
struct Surface(Rc<RefCell<String>>);

impl CodeSurface for Surface {
    fn value(&self) -> String {
        self.0.borrow().clone()
    }

    fn set_value(&mut self, text: &str) {
        *self.0.borrow_mut() = text.to_string();
    }

    fn set_language(&mut self, _: &str) {}

    fn dispose(&mut self) {}
}

#[derive(Default)]
struct Loader(RefCell<Vec<Surface>>);

impl SurfaceLoader for Loader {
    type Surface = Surface;

    fn load(&self, seed: SurfaceSeed) -> impl Future<Output = Result<Surface, SurfaceError>> {
        let surface = Surface(Rc::new(RefCell::new(seed.code)));
        self.0.borrow_mut().push(surface.clone());
        ready(Ok(surface))
    }
}

fn editor(doc: Document, config: EditorConfig) -> Editor<Surface, Host> {
    Editor::new(doc, Arc::new(default_catalog()), config, Host::default()).unwrap()
}

fn type_keys(ed: &mut Editor<Surface, Host>, text: &str) {
    for c in text.chars() {
        ed.handle_key(KeyCombo::new(Key::character(c.to_string())))
            .unwrap();
    }
}

fn load_surfaces(ed: &mut Editor<Surface, Host>, loader: &Loader) {
    let mut fut = pin!(ed.load_pending_surfaces(loader));
    let mut cx = Context::from_waker(Waker::noop());
    let Poll::Ready(result) = fut.as_mut().poll(&mut cx) else {
        panic!("loader resolves immediately");
    };
    result.unwrap();
}

#[test]
fn daily_page_survives_save_and_reload() {
    let mut ed = editor(Document::empty(), EditorConfig::default());
    type_keys(&mut ed, "/daily");
    assert!(ed.host().visible);
    assert_eq!(ed.host().titles, ["Daily reflection"]);
    ed.handle_key(KeyCombo::new(Key::Enter)).unwrap();
    assert!(!ed.host().visible);
    assert_eq!(ed.document().blocks().len(), 7);

    let answer = ed.document().blocks()[2].id();
    ed.set_caret(Some(Caret::new(answer, 0)));
    type_keys(&mut ed, "Ran 5km, pace $$5:30$$ per km");

    let json = ed.to_json().unwrap();
    let reloaded = serialize::from_json(&json).unwrap();
    assert_eq!(&reloaded, ed.document());

    let markdown = ed.to_markdown();
    assert!(markdown.starts_with("## Daily reflection\n\n### What went well today?\n\n"));
    assert!(markdown.contains("Ran 5km, pace $$5:30$$ per km"));

    let html = ed.to_html(&HtmlOptions::default());
    assert_eq!(&serialize::from_html(&html).unwrap(), ed.document());
}

#[test]
fn code_block_from_command_to_committed_text() {
    let config = EditorConfig::from_toml_str(
        r#"
        debounce_ms = 50
        default_code_language = "rust"

        [suggestion]
        trigger = "@"
        "#,
    )
    .unwrap();
    let mut ed = editor(Document::empty(), config);

    // The slash is plain text under this config.
    type_keys(&mut ed, "/");
    assert!(!ed.host().visible);
    ed.handle_key(KeyCombo::new(Key::Backspace)).unwrap();

    type_keys(&mut ed, "@code");
    assert_eq!(
        ed.handle_key(KeyCombo::new(Key::Enter)).unwrap(),
        KeyDisposition::ConsumedBySuggestion
    );
    let code = ed.document().blocks()[0].id();
    assert_eq!(ed.document().blocks()[0].kind(), NodeKind::CodeBlock);
    assert_eq!(ed.document().blocks()[0].attr("language"), Some("rust"));

    let loader = Loader::default();
    load_surfaces(&mut ed, &loader);
    let surface = loader.0.borrow()[0].clone();

    let t0 = Instant::now();
    *surface.0.borrow_mut() = "fn main() {}".into();
    ed.surface_changed(code, t0).unwrap();
    *surface.0.borrow_mut() = "fn main() { run() }".into();
    ed.surface_changed(code, t0 + Duration::from_millis(30)).unwrap();

    assert!(ed.tick(t0 + Duration::from_millis(60)).unwrap().is_empty());
    assert_eq!(ed.tick(t0 + Duration::from_millis(80)).unwrap().len(), 1);
    assert_eq!(
        ed.document().blocks()[0].attr("code"),
        Some("fn main() { run() }")
    );
    assert!(ed.to_markdown().starts_with("```rust\nfn main() { run() }\n```"));

    ed.teardown();
}

#[test]
fn loading_rejects_schema_violations() {
    let err = serialize::from_json(
        r#"{"type":"doc","content":[{"type":"bullet_list","content":[{"type":"paragraph"}]}]}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("violates the schema"));

    let doc = Document::new(vec![Node::math_block(r"\frac{a}{b}")]).unwrap();
    let ed = editor(doc, EditorConfig::default());
    let math = ed.document().blocks()[0].id();
    assert!(ed.render_math_slot(math).unwrap().contains("math-node-block"));
}
