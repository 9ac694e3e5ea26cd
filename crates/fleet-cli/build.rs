fn main() {
    fleet_version::build();
}
