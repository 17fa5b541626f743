use crate::config::SiteConfig;
use crate::pagination::RevealControl;

/// Class and label fragments used to pick a reveal control
#[derive(Debug, Clone, Default)]
pub struct ControlHints {
    pub listing_container: Vec<String>,
    pub filter_container: Vec<String>,
    pub reveal_texts: Vec<String>,
}

impl ControlHints {
    pub fn from_site(site: &SiteConfig) -> Self {
        let lower = |values: &[String]| -> Vec<String> {
            values.iter().map(|v| v.to_lowercase()).collect()
        };
        Self {
            listing_container: lower(&site.listing_container_hints),
            filter_container: lower(&site.filter_container_hints),
            reveal_texts: lower(&site.reveal_texts),
        }
    }

    fn is_filter(&self, control: &RevealControl) -> bool {
        contains_any(&control.classes, &self.filter_container)
            || control
                .ancestor_classes
                .iter()
                .any(|classes| contains_any(classes, &self.filter_container))
    }

    fn in_listing(&self, control: &RevealControl) -> bool {
        control
            .ancestor_classes
            .iter()
            .any(|classes| contains_any(classes, &self.listing_container))
    }

    fn has_reveal_label(&self, control: &RevealControl) -> bool {
        contains_any(&control.text, &self.reveal_texts)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

/// Picks the control to activate for the next Loading step
///
/// # Selection Order
///
/// 1. A control matching the site's product-finder reveal selector
/// 2. A reveal-labelled control inside a product-listing container and not
///    inside a filter/facet container
/// 3. Any reveal-labelled control that is not a filter control
///
/// Disabled controls are never selected; hidden ones are, and are later
/// invoked through the direct activation path.
pub fn select_control<'a>(
    controls: &'a [RevealControl],
    hints: &ControlHints,
) -> Option<&'a RevealControl> {
    let enabled = || controls.iter().filter(|c| c.enabled);

    enabled()
        .find(|c| c.matches_reveal_selector)
        .or_else(|| {
            enabled().find(|c| {
                hints.has_reveal_label(c) && hints.in_listing(c) && !hints.is_filter(c)
            })
        })
        .or_else(|| enabled().find(|c| hints.has_reveal_label(c) && !hints.is_filter(c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints() -> ControlHints {
        ControlHints::from_site(&SiteConfig::default())
    }

    fn control(index: usize, text: &str, ancestors: &[&str]) -> RevealControl {
        RevealControl {
            index,
            text: text.to_string(),
            classes: "btn".to_string(),
            ancestor_classes: ancestors.iter().map(|a| a.to_string()).collect(),
            matches_reveal_selector: false,
            enabled: true,
            visible: true,
        }
    }

    #[test]
    fn test_site_selector_wins() {
        let mut site = control(2, "See all", &["pd19-product-finder__view-more"]);
        site.matches_reveal_selector = true;
        site.visible = false;

        let controls = vec![
            control(0, "Load more", &["product-list"]),
            control(1, "View more", &[]),
            site,
        ];
        let chosen = select_control(&controls, &hints()).unwrap();
        assert_eq!(chosen.index, 2);
    }

    #[test]
    fn test_listing_container_preferred_over_generic() {
        let controls = vec![
            control(0, "View more", &["promo-banner"]),
            control(1, "View more", &["product-card-grid", "content"]),
        ];
        let chosen = select_control(&controls, &hints()).unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn test_filter_controls_skipped() {
        let controls = vec![
            control(0, "Show more", &["filter-panel", "product-finder"]),
            control(1, "Load more", &["sidebar"]),
        ];
        assert!(select_control(&controls, &hints()).is_none());

        let mut own_class = control(2, "View more", &["product-list"]);
        own_class.classes = "facet-toggle".to_string();
        assert!(select_control(&[own_class], &hints()).is_none());
    }

    #[test]
    fn test_generic_text_fallback() {
        let controls = vec![
            control(0, "Add to basket", &["product-list"]),
            control(1, "LOAD MORE", &["content"]),
        ];
        let chosen = select_control(&controls, &hints()).unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn test_disabled_never_selected() {
        let mut site = control(0, "View more", &["product-finder"]);
        site.matches_reveal_selector = true;
        site.enabled = false;

        let mut generic = control(1, "Load more", &[]);
        generic.enabled = false;

        assert!(select_control(&[site, generic], &hints()).is_none());
    }
}
