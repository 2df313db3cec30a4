//! SOAP envelope structures

use xmltree::Element;

/// Parsed SOAP envelope, only the body is kept
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    /// SOAP body holding the action response or a fault
    pub body: SoapBody,
}

/// SOAP body
#[derive(Debug, Clone)]
pub struct SoapBody {
    pub content: Element,
}
