mod common;
mod routing;
mod substitution;
