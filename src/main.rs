fn main() {
    mod_packer_lib::run()
}
