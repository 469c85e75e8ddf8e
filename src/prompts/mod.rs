pub mod illustrate;
