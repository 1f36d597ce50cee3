use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

/// Attribute holding an element's text content.
const TEXT_ATTRIBUTE: &str = "innerText";

/// A UI node owned by the host.
///
/// Scripts only see elements through attribute access and `+`, which
/// appends a child.
pub trait HostElement: fmt::Debug {
    fn tag_name(&self) -> String;

    fn get_attribute(&self, name: &str) -> Option<String>;

    fn set_attribute(&self, name: &str, value: &str);

    fn append_child(&self, child: ElementRef);

    /// Markup for the element and its subtree.
    fn render(&self) -> String;
}

pub type ElementRef = Rc<dyn HostElement>;

/// In-memory element for hosts without a document.
#[derive(Debug, Default)]
pub struct VirtualElement {
    tag: String,
    attributes: RefCell<BTreeMap<String, String>>,
    children: RefCell<Vec<ElementRef>>,
}

impl VirtualElement {
    pub fn new(tag: impl Into<String>) -> Self {
        VirtualElement {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn children(&self) -> Vec<ElementRef> {
        self.children.borrow().clone()
    }
}

impl HostElement for VirtualElement {
    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    fn append_child(&self, child: ElementRef) {
        self.children.borrow_mut().push(child);
    }

    fn render(&self) -> String {
        let attributes = self.attributes.borrow();
        let mut out = format!("<{}", self.tag);
        for (name, value) in attributes.iter().filter(|(n, _)| *n != TEXT_ATTRIBUTE) {
            out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
        }
        out.push('>');

        if let Some(text) = attributes.get(TEXT_ATTRIBUTE) {
            out.push_str(&escape(text));
        }
        for child in self.children.borrow().iter() {
            out.push_str(&child.render());
        }

        out.push_str(&format!("</{}>", self.tag));
        out
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
