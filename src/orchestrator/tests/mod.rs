use super::test_helpers::*;
use super::*;
use crate::error::Error;
use crate::types::*;
use reqwest::Method;
use serde_json::json;

mod steps;
