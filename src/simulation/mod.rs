pub mod pot_generator;
