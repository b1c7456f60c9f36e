use html_escape::encode_text;

/// What the host popup shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupContent {
    Items {
        items: Vec<PopupItem>,
        selected: usize,
    },
    /// The query matched nothing.
    NoMatches,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupItem {
    pub title: String,
    pub category: String,
}

impl PopupContent {
    pub fn selected(&self) -> Option<&PopupItem> {
        match self {
            PopupContent::Items { items, selected } => items.get(*selected),
            PopupContent::NoMatches => None,
        }
    }

    /// Default markup for hosts that don't draw the list themselves.
    /// Category headers appear wherever the category changes.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<div class=\"suggestion-popup\" role=\"listbox\">");
        match self {
            PopupContent::NoMatches => {
                out.push_str("<div class=\"suggestion-empty\">No matches</div>");
            }
            PopupContent::Items { items, selected } => {
                let mut category = None;
                for (i, item) in items.iter().enumerate() {
                    if category != Some(item.category.as_str()) {
                        category = Some(item.category.as_str());
                        out.push_str("<div class=\"suggestion-category\">");
                        out.push_str(&encode_text(&item.category));
                        out.push_str("</div>");
                    }
                    let active = i == *selected;
                    out.push_str(&format!(
                        "<div class=\"suggestion-item{}\" role=\"option\" aria-selected=\"{active}\" data-index=\"{i}\">{}</div>",
                        if active { " is-selected" } else { "" },
                        encode_text(&item.title)
                    ));
                }
            }
        }
        out.push_str("</div>");
        out
    }
}
