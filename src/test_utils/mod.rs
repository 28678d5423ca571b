#![allow(missing_docs)]

pub(crate) mod db;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use db::{create_test_user, get_test_connection};
pub(crate) use form::{
    assert_form_error_message, assert_form_input, assert_form_input_with_value,
    assert_form_submit_button_with_text, assert_hx_endpoint, must_get_form,
    must_get_form_with_action,
};
pub(crate) use html::{assert_valid_html, contains, parse_html_document, text_of, texts_of};
pub(crate) use http::{assert_content_type, assert_redirect};
