use crate::FetchError;
use async_trait::async_trait;
use serde::Deserialize;

/// A clickable element that might reveal more products
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RevealControl {
    /// Position of the control in the session's enumeration
    pub index: usize,

    /// Visible label, trimmed
    pub text: String,

    /// The control's own class attribute
    pub classes: String,

    /// Class attributes of its ancestors, nearest first
    pub ancestor_classes: Vec<String>,

    /// Whether it matches the site's reveal selector
    pub matches_reveal_selector: bool,

    pub enabled: bool,
    pub visible: bool,
}

/// How a control is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Simulated pointer click at the element
    Pointer,
    /// Direct invocation of the element's click handler
    Direct,
}

impl RevealControl {
    /// Activation path for this control
    ///
    /// Enabled controls that are hidden (zero-size, off-screen, or styled
    /// away) cannot receive a pointer click and are invoked directly.
    pub fn activation(&self) -> Activation {
        if self.visible {
            Activation::Pointer
        } else {
            Activation::Direct
        }
    }
}

/// An open listing page that can be read and interacted with
///
/// The rendered tier implements this over a live browser page; the static
/// tier implements it over fetched HTML with no controls.
#[async_trait]
pub trait ListingSession: Send {
    /// The listing URL the session was opened on
    fn url(&self) -> &str;

    /// Raw `href` values of every link currently in the page
    async fn links(&mut self) -> Result<Vec<String>, FetchError>;

    /// Every candidate control currently in the page
    async fn controls(&mut self) -> Result<Vec<RevealControl>, FetchError>;

    /// Invokes a control returned by the latest `controls` call
    async fn activate(
        &mut self,
        control: &RevealControl,
        activation: Activation,
    ) -> Result<(), FetchError>;

    /// Waits for the page to settle after navigation or activation
    async fn settle(&mut self) -> Result<(), FetchError>;
}
